use crate::balance::Balances;
use crate::error::SettlementError;
use crate::money::EPSILON;
use crate::schemas::ParticipantId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settlement {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub amount: Decimal,
}

#[derive(Clone, Debug)]
struct PersonalBalance {
    id: ParticipantId,
    // Always positive: what is still owed to or by this participant.
    remaining: Decimal,
}

// Largest remaining first, ties broken by the lexicographically smallest id.
fn settle_first(a: &PersonalBalance, b: &PersonalBalance) -> Ordering {
    a.remaining
        .cmp(&b.remaining)
        .then_with(|| b.id.cmp(&a.id))
}

fn take_largest(people: &mut Vec<PersonalBalance>) -> Option<PersonalBalance> {
    let idx = people
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| settle_first(a, b))
        .map(|(idx, _)| idx)?;
    Some(people.swap_remove(idx))
}

/// Turns net balances into transfers that bring everyone back to zero.
///
/// Greedy: the largest debtor always pays the largest creditor. This uses at
/// most one transfer fewer than the number of unsettled participants but is
/// not guaranteed to be the smallest possible plan.
pub fn compute_settlements(balances: &Balances) -> Result<Vec<Settlement>, SettlementError> {
    let total = balances.total();
    if total.abs() > balances.tolerance() {
        tracing::error!(%total, "balances do not sum to zero");
        return Err(SettlementError::ImbalancedLedger { total });
    }

    // Divide people into creditors and debtors
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();
    for (id, balance) in balances.iter() {
        let person = PersonalBalance {
            id: id.clone(),
            remaining: balance.abs(),
        };
        if balance > EPSILON {
            creditors.push(person);
        } else if balance < -EPSILON {
            debtors.push(person);
        }
    }

    let mut settlements = Vec::new();
    while let (Some(mut creditor), Some(mut debtor)) =
        (take_largest(&mut creditors), take_largest(&mut debtors))
    {
        let amount = creditor.remaining.min(debtor.remaining);
        settlements.push(Settlement {
            from: debtor.id.clone(),
            to: creditor.id.clone(),
            amount,
        });
        creditor.remaining -= amount;
        debtor.remaining -= amount;

        if creditor.remaining > EPSILON {
            creditors.push(creditor);
        }
        if debtor.remaining > EPSILON {
            debtors.push(debtor);
        }
    }

    tracing::debug!(transfers = settlements.len(), "planned settlements");
    Ok(settlements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn balances(entries: &[(&str, Decimal)]) -> Balances {
        entries
            .iter()
            .map(|(id, amount)| (id.to_string(), *amount))
            .collect()
    }

    fn transfer(from: &str, to: &str, amount: Decimal) -> Settlement {
        Settlement {
            from: from.to_owned(),
            to: to.to_owned(),
            amount,
        }
    }

    #[rstest]
    #[case::one_creditor(
        &[("a", dec!(200)), ("b", dec!(-100)), ("c", dec!(-100))],
        vec![transfer("b", "a", dec!(100)), transfer("c", "a", dec!(100))]
    )]
    #[case::largest_pairs_first(
        &[("a", dec!(50)), ("b", dec!(30)), ("c", dec!(-60)), ("d", dec!(-20))],
        vec![
            transfer("c", "a", dec!(50)),
            transfer("d", "b", dec!(20)),
            transfer("c", "b", dec!(10)),
        ]
    )]
    #[case::ties_by_id(
        &[("z", dec!(10)), ("y", dec!(10)), ("b", dec!(-10)), ("a", dec!(-10))],
        vec![transfer("a", "y", dec!(10)), transfer("b", "z", dec!(10))]
    )]
    #[case::settled(&[("a", dec!(0)), ("b", dec!(0.004)), ("c", dec!(-0.004))], vec![])]
    #[case::empty(&[], vec![])]
    fn settlement_cases(#[case] entries: &[(&str, Decimal)], #[case] expected: Vec<Settlement>) {
        let plan = compute_settlements(&balances(entries)).unwrap();
        assert_eq!(plan, expected);
    }

    #[test]
    fn imbalanced_balances_are_refused() {
        let err = compute_settlements(&balances(&[("a", dec!(10)), ("b", dec!(-9))])).unwrap_err();
        assert_eq!(err, SettlementError::ImbalancedLedger { total: dec!(1) });
    }

    #[test]
    fn rounding_drift_within_tolerance_is_accepted() {
        let drifting = Balances::new(
            [("a".to_owned(), dec!(10.01)), ("b".to_owned(), dec!(-10))]
                .into_iter()
                .collect(),
            dec!(0.02),
        );
        let plan = compute_settlements(&drifting).unwrap();
        assert_eq!(plan, vec![transfer("b", "a", dec!(10))]);
    }
}
