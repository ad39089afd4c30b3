//! Cross-cutting error types for Rewind.
//!
//! Errors here can originate from any crate that touches raw values or
//! metadata. Engine-level errors (`AuditError`) live in `rewind-db`.

use thiserror::Error;

use crate::storage::StorageType;

/// Errors that can be raised by any Rewind crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A raw column value could not be converted to its declared storage type.
    #[error("Cannot convert {raw} to {storage_type}: {reason}")]
    Conversion {
        storage_type: StorageType,
        raw: String,
        reason: String,
    },

    /// A revision-kind column held an unknown marker.
    #[error("Invalid revision kind: {0}")]
    InvalidRevisionKind(String),

    /// An identifier was built with the wrong number of values.
    #[error("Identifier for {entity_type} expects {expected} value(s), got {actual}")]
    IdentifierArity {
        entity_type: String,
        expected: usize,
        actual: usize,
    },

    /// Metadata failed validation (missing identifier, duplicate field, ...).
    #[error("Invalid metadata for {entity_type}: {reason}")]
    InvalidMetadata { entity_type: String, reason: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
