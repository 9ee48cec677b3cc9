//! The module contains the error the engine can throw.
//!
//! The errors map onto three families:
//!
//! - not found: [`KeyNotFound`], for missing, foreign or inactive references.
//! - invalid argument: [`InvalidArgument`] and [`ExistingKey`], always raised
//!   before anything is written.
//! - storage: [`Database`] and [`Conflict`] are retryable, while
//!   [`LedgerInconsistent`] reports a balance that no longer matches the
//!   transactions referencing its account.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidArgument`]: EngineError::InvalidArgument
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Database`]: EngineError::Database
//!  [`Conflict`]: EngineError::Conflict
//!  [`LedgerInconsistent`]: EngineError::LedgerInconsistent
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("ledger inconsistent for account {account_id}: stored {stored}, expected {expected}")]
    LedgerInconsistent {
        account_id: Uuid,
        stored: i64,
        expected: i64,
    },
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// A unique index rejecting `key` becomes [`EngineError::ExistingKey`];
    /// any other store error passes through.
    pub(crate) fn existing_on_conflict(err: DbErr, key: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::ExistingKey(key.into()),
            _ => Self::Database(err),
        }
    }

    /// Whether the same call may succeed if issued again unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Conflict(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (
                Self::InvalidArgument {
                    field: fa,
                    reason: ra,
                },
                Self::InvalidArgument {
                    field: fb,
                    reason: rb,
                },
            ) => fa == fb && ra == rb,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (
                Self::LedgerInconsistent {
                    account_id: ia,
                    stored: sa,
                    expected: ea,
                },
                Self::LedgerInconsistent {
                    account_id: ib,
                    stored: sb,
                    expected: eb,
                },
            ) => ia == ib && sa == sb && ea == eb,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
