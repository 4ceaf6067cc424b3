use crate::error::{LedgerError, ValidationReason};
use crate::money::{self, MAX_AMOUNT, MAX_CURRENCY_SCALE};
use crate::schemas::{
    Budget, Currency, Expense, ExpenseDraft, ExpenseId, LedgerState, Participant, ParticipantId,
    Split, TRIP_OWNER_ID,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::ops::Deref;
use std::sync::Arc;

/// Participants and expenses of one trip.
///
/// Every mutation is validated up front and either applies fully or leaves
/// the ledger untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    state: LedgerState,
}

/// Immutable view of a ledger, cheap to clone and share across threads.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerSnapshot(Arc<LedgerState>);

impl Deref for LedgerSnapshot {
    type Target = LedgerState;

    fn deref(&self) -> &LedgerState {
        &self.0
    }
}

impl Ledger {
    /// Fails with `invalid currency` when the minor unit is finer than
    /// [`MAX_CURRENCY_SCALE`] digits.
    pub fn new(currency: Currency) -> Result<Self, LedgerError> {
        if currency.scale > MAX_CURRENCY_SCALE {
            return Err(ValidationReason::InvalidCurrency.into());
        }
        Ok(Self {
            state: LedgerState {
                currency,
                ..LedgerState::default()
            },
        })
    }

    /// Starts a trip whose owner is registered under the reserved owner id.
    pub fn with_owner(
        currency: Currency,
        owner_name: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(currency)?;
        ledger.add_participant(Participant::new(TRIP_OWNER_ID, owner_name))?;
        Ok(ledger)
    }

    /// Rebuilds a ledger from persisted state, validating every record again.
    pub fn from_state(state: LedgerState) -> Result<Self, LedgerError> {
        let LedgerState {
            currency,
            participants,
            expenses,
            budget,
        } = state;
        let mut ledger = Self::new(currency)?;
        for participant in participants {
            ledger.add_participant(participant)?;
        }
        for expense in expenses {
            ledger.add_expense(expense.into())?;
        }
        ledger.set_budget(budget)?;
        Ok(ledger)
    }

    pub fn currency(&self) -> &Currency {
        &self.state.currency
    }

    pub fn participants(&self) -> &[Participant] {
        &self.state.participants
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.state.expenses
    }

    pub fn budget(&self) -> &Budget {
        &self.state.budget
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot(Arc::new(self.state.clone()))
    }

    fn is_participant(&self, id: &str) -> bool {
        self.state.participants.iter().any(|p| p.id == id)
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), LedgerError> {
        if self.is_participant(&participant.id) {
            return Err(LedgerError::DuplicateParticipant(participant.id));
        }
        tracing::info!(participant = %participant.id, "participant joined trip");
        self.state.participants.push(participant);
        Ok(())
    }

    pub fn add_expense(&mut self, draft: ExpenseDraft) -> Result<&Expense, LedgerError> {
        let expense = self.validate(draft).map_err(|reason| {
            tracing::debug!(%reason, "expense rejected");
            LedgerError::Validation(reason)
        })?;
        tracing::info!(
            expense = %expense.id,
            amount = %expense.amount,
            paid_by = %expense.paid_by,
            "expense added"
        );
        self.state.expenses.push(expense);
        Ok(&self.state.expenses[self.state.expenses.len() - 1])
    }

    /// Removes an expense, failing with [`LedgerError::NotFound`] for unknown ids.
    pub fn remove_expense(&mut self, id: &str) -> Result<Expense, LedgerError> {
        let position = self
            .state
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_owned()))?;
        tracing::info!(expense = %id, "expense removed");
        Ok(self.state.expenses.remove(position))
    }

    pub fn set_budget(&mut self, budget: Budget) -> Result<(), LedgerError> {
        let scale = self.state.currency.scale;
        for amount in std::iter::once(&budget.total).chain(budget.categories.values()) {
            check_amount(*amount, scale)?;
        }
        self.state.budget = budget;
        Ok(())
    }

    /// Forgets everything about the trip; the currency is kept.
    pub fn clear(&mut self) {
        self.state.participants.clear();
        self.state.expenses.clear();
        self.state.budget = Budget::default();
    }

    fn validate(&self, draft: ExpenseDraft) -> Result<Expense, ValidationReason> {
        let scale = self.state.currency.scale;
        check_amount(draft.amount, scale)?;

        let paid_by = draft
            .paid_by
            .unwrap_or_else(|| TRIP_OWNER_ID.to_owned());
        if !self.is_participant(&paid_by) {
            return Err(ValidationReason::UnknownParticipant);
        }

        if draft.split.is_shared() && draft.split.beneficiaries().next().is_none() {
            return Err(ValidationReason::EmptyBeneficiaries);
        }
        self.check_known(draft.split.beneficiaries())?;

        if let Split::Custom { split_amounts } = &draft.split {
            for amount in split_amounts.values() {
                check_amount(*amount, scale)?;
            }
            let total: Decimal = split_amounts.values().copied().sum();
            if (total - draft.amount).abs() > money::split_tolerance(scale) {
                return Err(ValidationReason::SplitMismatch);
            }
        }

        let id = match draft.id {
            Some(id) if self.has_expense(&id) => return Err(ValidationReason::DuplicateExpenseId),
            Some(id) => id,
            None => self.next_expense_id(),
        };

        Ok(Expense {
            id,
            title: draft.title,
            amount: draft.amount,
            category: draft.category,
            paid_by,
            split: draft.split,
            created_at: draft.created_at.unwrap_or_else(Utc::now),
        })
    }

    fn check_known<'a>(
        &self,
        mut ids: impl Iterator<Item = &'a ParticipantId>,
    ) -> Result<(), ValidationReason> {
        if ids.all(|id| self.is_participant(id)) {
            Ok(())
        } else {
            Err(ValidationReason::UnknownParticipant)
        }
    }

    fn has_expense(&self, id: &str) -> bool {
        self.state.expenses.iter().any(|e| e.id == id)
    }

    fn next_expense_id(&self) -> ExpenseId {
        let mut millis = Utc::now().timestamp_millis();
        while self.has_expense(&millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }
}

fn check_amount(amount: Decimal, scale: u32) -> Result<(), ValidationReason> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationReason::NegativeAmount);
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationReason::AmountTooLarge);
    }
    if !money::fits_scale(amount, scale) {
        return Err(ValidationReason::ExcessPrecision);
    }
    Ok(())
}
