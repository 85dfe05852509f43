//! The module contains the errors the ledger engine can throw.
//!
//! Every business-rule violation has its own variant so callers can render an
//! actionable message:
//!
//! - [`Validation`] malformed or missing input (zero share amount, self-transfer).
//! - [`Conflict`] duplicate open target, or concurrent-write retries exhausted.
//! - [`State`] illegal transition (reviewing a decided entry, double reversal).
//! - [`Forbidden`] the actor lacks the capability for the requested change.
//! - [`InsufficientBalance`] a share exceeds the sender's available balance.
//! - [`NotFound`] unknown target, progress entry or fund share.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Conflict`]: EngineError::Conflict
//!  [`State`]: EngineError::State
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`NotFound`]: EngineError::NotFound
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::Money;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid state: {0}")]
    State(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { available: Money, requested: Money },
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::State(_) => "state",
            Self::Forbidden(_) => "forbidden",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
        }
    }

    /// Returns `true` for storage errors worth retrying (busy/locked database,
    /// deadlock, serialization failure).
    pub(crate) fn is_transient(&self) -> bool {
        let Self::Database(err) = self else {
            return false;
        };
        let message = err.to_string().to_lowercase();
        ["database is locked", "database table is locked", "busy", "deadlock", "could not serialize"]
            .iter()
            .any(|needle| message.contains(needle))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::Conflict(format!("unique constraint violated: {detail}"));
        }
        Self::Database(err)
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::State(a), Self::State(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (
                Self::InsufficientBalance {
                    available: a1,
                    requested: r1,
                },
                Self::InsufficientBalance {
                    available: a2,
                    requested: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
