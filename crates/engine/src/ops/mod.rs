use sea_orm::DatabaseConnection;

use crate::{ResultEngine, locks::AccountLocks};

mod access;
mod accounts;
mod balances;
mod categories;
mod transactions;

pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// An early `?` inside the block drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` to serve concurrent
/// requests. All balance mutations of a process must go through a single
/// engine so the per-account locks are shared.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    locks: AccountLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            locks: AccountLocks::default(),
        })
    }
}
