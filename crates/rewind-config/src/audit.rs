//! Audit table naming, revision columns, and tracked entities.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_table_suffix() -> String {
    "_audit".to_string()
}

fn default_revision_field_name() -> String {
    "rev".to_string()
}

fn default_revision_type_field_name() -> String {
    "revtype".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Prepended to an entity's base table name to form its audit table.
    #[serde(default)]
    pub table_prefix: String,

    /// Appended to an entity's base table name to form its audit table.
    #[serde(default = "default_table_suffix")]
    pub table_suffix: String,

    /// Column holding the revision number.
    #[serde(default = "default_revision_field_name")]
    pub revision_field_name: String,

    /// Column holding the revision kind (`INS` / `UPD` / `DEL`).
    #[serde(default = "default_revision_type_field_name")]
    pub revision_type_field_name: String,

    /// Entity type names whose history is recorded.
    #[serde(default)]
    pub audited_entities: Vec<String>,

    /// Soft-delete timestamp field cleared when restoring a deletion.
    #[serde(default)]
    pub deleted_at_field: Option<String>,

    /// Soft-delete actor field cleared when restoring a deletion.
    #[serde(default)]
    pub deleted_by_field: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            table_suffix: default_table_suffix(),
            revision_field_name: default_revision_field_name(),
            revision_type_field_name: default_revision_type_field_name(),
            audited_entities: Vec::new(),
            deleted_at_field: None,
            deleted_by_field: None,
        }
    }
}

impl AuditConfig {
    /// Audit table for a base table: prefix + base + suffix.
    pub fn table_name_for(&self, base_table: &str) -> String {
        format!("{}{base_table}{}", self.table_prefix, self.table_suffix)
    }

    pub fn is_audited(&self, entity_type: &str) -> bool {
        self.audited_entities.iter().any(|e| e == entity_type)
    }

    /// Check that the revision columns are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a revision column name is empty
    /// or both revision columns share a name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.revision_field_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "audit.revision_field_name".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.revision_type_field_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "audit.revision_type_field_name".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.revision_field_name == self.revision_type_field_name {
            return Err(ConfigError::InvalidValue {
                field: "audit.revision_type_field_name".into(),
                reason: format!(
                    "must differ from revision_field_name ('{}')",
                    self.revision_field_name
                ),
            });
        }
        Ok(())
    }
}
