//! Shared-expense ledger and settlement engine for group trips.
//!
//! Data flows one way: a [`Ledger`] is mutated by its owner, a
//! [`LedgerSnapshot`] of it feeds [`compute_balances`], and the resulting
//! [`Balances`] feed [`compute_settlements`].

pub mod balance;
pub mod budget;
pub mod config;
pub mod error;
pub mod ledger;
pub mod money;
pub mod routes;
pub mod schemas;
pub mod settlement;
pub mod store;

pub use balance::{compute_balances, direct_debts, expense_shares, Balances};
pub use error::{ConfigError, LedgerError, SettlementError, StoreError, ValidationReason};
pub use ledger::{Ledger, LedgerSnapshot};
pub use schemas::{
    Budget, Category, Currency, Expense, ExpenseDraft, ExpenseId, LedgerState, Participant,
    ParticipantId, Split, TRIP_OWNER_ID,
};
pub use settlement::{compute_settlements, Settlement};
pub use store::{LedgerStore, MemoryStore, MongoStore};
