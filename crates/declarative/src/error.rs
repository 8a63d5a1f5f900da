//! Error type for the reconciliation layer
//!
//! Trait boundaries ([`crate::Resource`], [`crate::RemoteClient`]) return
//! `anyhow::Result` so implementors can attach their own context. The
//! operations defined in this crate return [`Error`].

use crate::constraint::RuleError;
use crate::lock::LockError;
use crate::registry::NotFoundError;
use crate::semantic::ComparisonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("attribute `{attribute}` is not known until apply and cannot be persisted")]
    UnknownValue { attribute: String },

    #[error("{kind} `{id}` does not exist; create it before its {collection}")]
    ParentMissing {
        kind: String,
        id: String,
        collection: String,
    },

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

pub type Result<T> = std::result::Result<T, Error>;
