//! Transaction ledger and balance reconciliation for personal-finance
//! accounts.
//!
//! The [`Engine`] keeps, for every account, the stored balance equal to the
//! sum of the effects of the transactions referencing it:
//!
//! - income adds its amount to the account
//! - expense subtracts its amount from the account
//! - transfer subtracts from the account and adds to the counter account
//!
//! Each create, update and delete runs as a single database transaction while
//! holding the per-account locks of every account involved, and balances are
//! only ever moved by relative adjustments evaluated by the database.

pub use accounts::{Account, AccountKind};
pub use categories::{Category, CategoryKind};
pub use commands::{CreateTransactionCmd, NewAccountCmd, NewCategoryCmd, UpdateTransactionCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, TransactionListFilter};
pub use transactions::{Frequency, Recurrence, Transaction, TransactionKind};
pub use views::{BalanceDrift, CategoryLabel, TransactionView};

mod accounts;
mod categories;
mod commands;
mod currency;
mod error;
mod locks;
mod money;
mod ops;
mod tags;
mod transactions;
mod util;
mod views;

type ResultEngine<T> = Result<T, EngineError>;
