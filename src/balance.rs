use crate::error::SettlementError;
use crate::money::{self, EPSILON, MAX_CURRENCY_SCALE};
use crate::schemas::{Expense, LedgerState, ParticipantId, Split};
use crate::settlement::Settlement;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Net position of every participant: positive is owed money, negative owes.
#[derive(Clone, Debug, PartialEq)]
pub struct Balances {
    amounts: BTreeMap<ParticipantId, Decimal>,
    tolerance: Decimal,
}

impl Balances {
    pub fn new(amounts: BTreeMap<ParticipantId, Decimal>, tolerance: Decimal) -> Self {
        Self {
            amounts,
            tolerance: tolerance.max(EPSILON),
        }
    }

    pub fn get(&self, participant: &str) -> Option<Decimal> {
        self.amounts.get(participant).copied()
    }

    pub fn amounts(&self) -> &BTreeMap<ParticipantId, Decimal> {
        &self.amounts
    }

    pub fn into_amounts(self) -> BTreeMap<ParticipantId, Decimal> {
        self.amounts
    }

    /// How far from zero the total may drift through accepted custom splits.
    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    pub fn total(&self) -> Decimal {
        self.amounts.values().copied().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, Decimal)> + '_ {
        self.amounts.iter().map(|(id, amount)| (id, *amount))
    }
}

impl FromIterator<(ParticipantId, Decimal)> for Balances {
    fn from_iter<T: IntoIterator<Item = (ParticipantId, Decimal)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect(), EPSILON)
    }
}

/// What each beneficiary owes for one expense, in beneficiary id order.
pub fn expense_shares(expense: &Expense, scale: u32) -> Vec<(&ParticipantId, Decimal)> {
    match &expense.split {
        Split::Equal { beneficiaries } => beneficiaries
            .iter()
            .zip(money::split_evenly(expense.amount, beneficiaries.len(), scale))
            .collect(),
        Split::Custom { split_amounts } => split_amounts
            .iter()
            .map(|(id, amount)| (id, *amount))
            .collect(),
        Split::None => Vec::new(),
    }
}

fn supported_scale(snapshot: &LedgerState) -> Result<u32, SettlementError> {
    let scale = snapshot.currency.scale;
    if scale > MAX_CURRENCY_SCALE {
        tracing::error!(scale, "ledger uses an unsupported currency scale");
        return Err(SettlementError::UnsupportedCurrency { scale });
    }
    Ok(scale)
}

pub fn compute_balances(snapshot: &LedgerState) -> Result<Balances, SettlementError> {
    let scale = supported_scale(snapshot)?;
    let mut amounts: BTreeMap<ParticipantId, Decimal> = snapshot
        .participants
        .iter()
        .map(|p| (p.id.clone(), Decimal::ZERO))
        .collect();
    let mut shared = 0u32;
    // Equal splits are exact; only custom splits may drift, each by less
    // than one minor unit.
    let mut tolerance = Decimal::ZERO;

    for expense in snapshot.expenses.iter().filter(|e| e.split.is_shared()) {
        shared += 1;
        if let Split::Custom { .. } = expense.split {
            tolerance += money::split_tolerance(scale);
        }
        *balance_of(&mut amounts, expense, &expense.paid_by)? += expense.amount;
        for (beneficiary, share) in expense_shares(expense, scale) {
            *balance_of(&mut amounts, expense, beneficiary)? -= share;
        }
    }

    let balances = Balances::new(amounts, tolerance);
    tracing::debug!(
        participants = balances.amounts.len(),
        expenses = shared,
        total = %balances.total(),
        "computed balances"
    );
    Ok(balances)
}

fn balance_of<'a>(
    amounts: &'a mut BTreeMap<ParticipantId, Decimal>,
    expense: &Expense,
    participant: &ParticipantId,
) -> Result<&'a mut Decimal, SettlementError> {
    amounts.get_mut(participant).ok_or_else(|| {
        tracing::error!(
            expense = %expense.id,
            participant = %participant,
            "ledger holds an expense for an unknown participant"
        );
        SettlementError::Integrity {
            expense: expense.id.clone(),
            participant: participant.clone(),
        }
    })
}

/// The transfers owed if nobody simplifies anything: each beneficiary pays
/// back the payer, netted per pair of participants.
pub fn direct_debts(snapshot: &LedgerState) -> Result<Vec<Settlement>, SettlementError> {
    let scale = supported_scale(snapshot)?;
    // Keyed by the ordered pair so both directions land in the same entry;
    // positive means the second participant owes the first.
    let mut pairs: BTreeMap<(&ParticipantId, &ParticipantId), Decimal> = BTreeMap::new();

    for expense in &snapshot.expenses {
        let payer = &expense.paid_by;
        for (beneficiary, share) in expense_shares(expense, scale) {
            if beneficiary == payer {
                continue;
            }
            let (key, amount) = if payer < beneficiary {
                ((payer, beneficiary), share)
            } else {
                ((beneficiary, payer), -share)
            };
            *pairs.entry(key).or_insert(Decimal::ZERO) += amount;
        }
    }

    let mut debts: Vec<Settlement> = pairs
        .into_iter()
        .filter(|(_, net)| !money::is_zero(*net))
        .map(|((first, second), net)| {
            let (from, to) = if net > Decimal::ZERO {
                (second, first)
            } else {
                (first, second)
            };
            Settlement {
                from: from.clone(),
                to: to.clone(),
                amount: net.abs(),
            }
        })
        .collect();
    debts.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
    Ok(debts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::schemas::{Category, Currency, ExpenseDraft, Participant};
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;

    #[fixture]
    fn trip() -> Ledger {
        let mut ledger = Ledger::new(Currency::default()).unwrap();
        for id in ["a", "b", "c"] {
            ledger
                .add_participant(Participant::new(id, id.to_uppercase()))
                .unwrap();
        }
        ledger
    }

    fn spend(ledger: &mut Ledger, payer: &str, amount: Decimal, split: Split) {
        ledger
            .add_expense(ExpenseDraft::new(amount, Category::Food, split).paid_by(payer))
            .unwrap();
    }

    #[rstest]
    fn one_payer_for_everyone(mut trip: Ledger) {
        spend(&mut trip, "a", dec!(300), Split::equal(["a", "b", "c"]));

        let balances = compute_balances(&trip.snapshot()).unwrap();
        assert_eq!(balances.get("a"), Some(dec!(200)));
        assert_eq!(balances.get("b"), Some(dec!(-100)));
        assert_eq!(balances.get("c"), Some(dec!(-100)));
    }

    #[rstest]
    fn equal_split_keeps_every_cent(mut trip: Ledger) {
        spend(&mut trip, "c", dec!(100), Split::equal(["a", "b", "c"]));

        let snapshot = trip.snapshot();
        let shares = expense_shares(&snapshot.expenses[0], 2);
        let shares: Vec<Decimal> = shares.into_iter().map(|(_, share)| share).collect();
        assert_eq!(shares, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);

        let balances = compute_balances(&snapshot).unwrap();
        assert_eq!(balances.get("a"), Some(dec!(-33.34)));
        assert_eq!(balances.get("c"), Some(dec!(66.67)));
        assert_eq!(balances.total(), Decimal::ZERO);
    }

    #[rstest]
    fn unshared_expenses_do_not_move_balances(mut trip: Ledger) {
        spend(&mut trip, "b", dec!(45), Split::None);

        let balances = compute_balances(&trip.snapshot()).unwrap();
        assert!(balances.iter().all(|(_, amount)| amount.is_zero()));
        assert_eq!(balances.tolerance(), EPSILON);
    }

    #[rstest]
    fn custom_split_uses_given_amounts(mut trip: Ledger) {
        spend(
            &mut trip,
            "b",
            dec!(90),
            Split::custom([("a", dec!(10)), ("b", dec!(30)), ("c", dec!(50))]),
        );

        let balances = compute_balances(&trip.snapshot()).unwrap();
        assert_eq!(balances.get("a"), Some(dec!(-10)));
        assert_eq!(balances.get("b"), Some(dec!(60)));
        assert_eq!(balances.get("c"), Some(dec!(-50)));
    }

    #[test]
    fn unknown_beneficiary_is_an_integrity_error() {
        let state = LedgerState {
            participants: vec![Participant::new("a", "A")],
            expenses: vec![Expense {
                id: "e1".to_owned(),
                title: String::new(),
                amount: dec!(10),
                category: Category::Food,
                paid_by: "a".to_owned(),
                split: Split::equal(["a", "ghost"]),
                created_at: Utc::now(),
            }],
            ..LedgerState::default()
        };

        assert_eq!(
            compute_balances(&state).unwrap_err(),
            SettlementError::Integrity {
                expense: "e1".to_owned(),
                participant: "ghost".to_owned(),
            }
        );
    }

    #[rstest]
    fn direct_debts_net_out_per_pair(mut trip: Ledger) {
        spend(&mut trip, "a", dec!(30), Split::equal(["a", "b", "c"]));
        spend(&mut trip, "b", dec!(40), Split::equal(["a", "b"]));

        let debts = direct_debts(&trip.snapshot()).unwrap();
        assert_eq!(
            debts,
            vec![
                Settlement {
                    from: "a".to_owned(),
                    to: "b".to_owned(),
                    amount: dec!(10),
                },
                Settlement {
                    from: "c".to_owned(),
                    to: "a".to_owned(),
                    amount: dec!(10),
                },
            ]
        );
    }

    #[test]
    fn unsupported_scale_is_refused_before_dividing() {
        let state = LedgerState {
            currency: Currency::new("XXX", 29),
            participants: vec![Participant::new("a", "A")],
            expenses: vec![Expense {
                id: "e1".to_owned(),
                title: String::new(),
                amount: dec!(10),
                category: Category::Food,
                paid_by: "a".to_owned(),
                split: Split::equal(["a"]),
                created_at: Utc::now(),
            }],
            ..LedgerState::default()
        };

        let expected = SettlementError::UnsupportedCurrency { scale: 29 };
        assert_eq!(compute_balances(&state).unwrap_err(), expected);
        assert_eq!(direct_debts(&state).unwrap_err(), expected);
    }

    #[test]
    fn largest_amounts_balance_without_overflow() {
        let currency = Currency::new("BTC", MAX_CURRENCY_SCALE);
        let mut ledger = Ledger::with_owner(currency, "Me").unwrap();
        ledger.add_participant(Participant::new("a", "A")).unwrap();
        for _ in 0..3 {
            spend(&mut ledger, "a", money::MAX_AMOUNT, Split::equal(["a", "main_user"]));
        }

        let balances = compute_balances(&ledger.snapshot()).unwrap();
        let half = money::MAX_AMOUNT * Decimal::from(3) / Decimal::TWO;
        assert_eq!(balances.get("a"), Some(half));
        assert_eq!(balances.total(), Decimal::ZERO);
    }

    #[test]
    fn fine_currency_custom_splits_stay_settleable() {
        let mut ledger = Ledger::with_owner(Currency::new("KWD", 3), "Me").unwrap();
        ledger.add_participant(Participant::new("a", "A")).unwrap();
        for _ in 0..2 {
            spend(
                &mut ledger,
                "main_user",
                dec!(10),
                Split::custom([("a", dec!(5.004)), ("main_user", dec!(4.996))]),
            );
        }

        let balances = compute_balances(&ledger.snapshot()).unwrap();
        assert_eq!(balances.total(), Decimal::ZERO);
        assert_eq!(balances.tolerance(), EPSILON);
        assert!(crate::settlement::compute_settlements(&balances).is_ok());
    }
}
