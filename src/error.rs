use crate::schemas::{ExpenseId, ParticipantId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Why an expense or budget was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("negative amount")]
    NegativeAmount,
    #[error("unknown participant")]
    UnknownParticipant,
    #[error("split mismatch")]
    SplitMismatch,
    #[error("empty beneficiaries")]
    EmptyBeneficiaries,
    #[error("excess precision")]
    ExcessPrecision,
    #[error("duplicate expense id")]
    DuplicateExpenseId,
    #[error("amount too large")]
    AmountTooLarge,
    #[error("invalid currency")]
    InvalidCurrency,
}

/// Recoverable failures of a ledger mutation. The ledger is left untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid expense: {0}")]
    Validation(ValidationReason),
    #[error("participant {0} is already part of the trip")]
    DuplicateParticipant(ParticipantId),
    #[error("expense {0} not found")]
    NotFound(ExpenseId),
}

impl From<ValidationReason> for LedgerError {
    fn from(reason: ValidationReason) -> Self {
        LedgerError::Validation(reason)
    }
}

/// Internal consistency failures while deriving balances or settlements.
///
/// These are unreachable while the ledger enforces its own invariants.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("expense {expense} references unknown participant {participant}")]
    Integrity {
        expense: ExpenseId,
        participant: ParticipantId,
    },
    #[error("balances sum to {total} instead of zero")]
    ImbalancedLedger { total: Decimal },
    #[error("currency scale {scale} is not supported")]
    UnsupportedCurrency { scale: u32 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("you need to add {0} to the env")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}
