//! Typed error kinds for the markup domain model.
//!
//! Builders validate first and compute second: a `MarkupError` is returned
//! instead of a partially constructed document. `InvalidEndType` is the one
//! kind callers never see directly: it is recovered locally (the offending
//! suffix is discarded and the block falls back to the default end type) and
//! only surfaces here for callers that want to observe the recovery.

use std::fmt;

/// A `.`-free, `/`-free path into a markup document, used to point at the
/// offending key when surfacing an [`MarkupError`] to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(pub String);

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl KeyPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("invalid document at {path}: {reason}")]
    InvalidDocument { path: KeyPath, reason: String },

    #[error("duplicate procedure_id {procedure_id:?}")]
    DuplicateProcedureId { procedure_id: String },

    #[error("invalid end type {raw:?} at {path}")]
    InvalidEndType { path: KeyPath, raw: String },

    #[error("{path} references unknown node {reference:?}")]
    UnknownReference { path: KeyPath, reference: String },
}

impl MarkupError {
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: KeyPath::new(path),
            reason: reason.into(),
        }
    }
}

pub type MarkupResult<T> = Result<T, MarkupError>;
