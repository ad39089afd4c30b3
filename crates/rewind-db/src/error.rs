//! Error types for the revision engine.

use rewind_core::errors::CoreError;
use thiserror::Error;

/// Errors from revision lookups, hydration, and restores.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The entity type is not configured for history tracking.
    #[error("Entity type {0} is not audited")]
    NotLogged(String),

    /// An exact revision lookup matched no row.
    #[error("No revision {revision} found for {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
        revision: i64,
    },

    /// An exact revision lookup matched several rows; identity + revision
    /// should be unique in an audit table.
    #[error("Found {count} rows for revision {revision} of {entity_type} {identifier}, expected one")]
    TooManyFound {
        entity_type: String,
        identifier: String,
        revision: i64,
        count: usize,
    },

    /// A search criterion names a member that cannot be queried.
    #[error("Field '{field}' is not a queryable field or association of {entity_type}")]
    IncorrectCriteria { field: String, entity_type: String },

    /// The metadata catalog has no entry for the type.
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// A restore target belongs to a different identity than the live object.
    #[error("Cannot restore {entity_type} {live} from a revision of {target}")]
    IdentityMismatch {
        entity_type: String,
        live: String,
        target: String,
    },

    /// A fatal metadata/audit-schema divergence found while hydrating.
    #[error("Hydration failed: {0}")]
    Hydration(#[from] HydrationDefect),

    /// An audit row lacks a column the engine relies on.
    #[error("Audit row is missing column '{0}'")]
    MissingColumn(String),

    /// A revision column held something other than an integer.
    #[error("Invalid revision number in column '{column}': {raw}")]
    InvalidRevision { column: String, raw: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuditError {
    /// True for errors that signal a metadata/configuration defect rather
    /// than a data condition. Retrying these without fixing the metadata is
    /// pointless.
    #[must_use]
    pub const fn is_configuration_defect(&self) -> bool {
        matches!(self, Self::Hydration(_))
    }
}

/// Configuration defects detected during polymorphic resolution.
#[derive(Debug, Error)]
pub enum HydrationDefect {
    #[error("{entity_type} row has no value in discriminator column '{column}'")]
    MissingDiscriminator { entity_type: String, column: String },

    #[error("{entity_type} has no discriminator map entry for '{value}'")]
    UnmappedDiscriminator { entity_type: String, value: String },

    #[error("{concrete_type} (reached from {entity_type}) is abstract and has no discriminator value of its own")]
    AbstractWithoutDiscriminator {
        entity_type: String,
        concrete_type: String,
    },
}
