//! Configuration collaborator backed by [`AuditConfig`].

use rewind_config::AuditConfig;
use rewind_core::identifier::Identifier;

use crate::ports::AuditConfiguration;

/// Audit settings plus the identities reverted through them.
#[derive(Debug, Clone, Default)]
pub struct AuditSettings {
    config: AuditConfig,
    reverted: Vec<(String, Identifier)>,
}

impl AuditSettings {
    #[must_use]
    pub const fn new(config: AuditConfig) -> Self {
        Self {
            config,
            reverted: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// `(entity type, identifier)` of every restore, in call order.
    #[must_use]
    pub fn reverted(&self) -> &[(String, Identifier)] {
        &self.reverted
    }
}

impl From<AuditConfig> for AuditSettings {
    fn from(config: AuditConfig) -> Self {
        Self::new(config)
    }
}

impl AuditConfiguration for AuditSettings {
    fn table_name_for(&self, base_table: &str) -> String {
        self.config.table_name_for(base_table)
    }

    fn is_logged(&self, entity_type: &str) -> bool {
        self.config.is_audited(entity_type)
    }

    fn deleted_at_field(&self) -> Option<&str> {
        self.config.deleted_at_field.as_deref()
    }

    fn deleted_by_field(&self) -> Option<&str> {
        self.config.deleted_by_field.as_deref()
    }

    fn mark_reverted(&mut self, entity_type: &str, identifier: &Identifier) {
        self.reverted
            .push((entity_type.to_string(), identifier.clone()));
    }

    fn revision_column(&self) -> &str {
        &self.config.revision_field_name
    }

    fn revision_type_column(&self) -> &str {
        &self.config.revision_type_field_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegates_to_config() {
        let mut settings = AuditSettings::from(AuditConfig {
            table_prefix: "h_".into(),
            audited_entities: vec!["Post".into()],
            deleted_at_field: Some("deleted_at".into()),
            ..Default::default()
        });

        assert_eq!(settings.table_name_for("posts"), "h_posts_audit");
        assert!(settings.is_logged("Post"));
        assert!(!settings.is_logged("User"));
        assert_eq!(settings.deleted_at_field(), Some("deleted_at"));
        assert_eq!(settings.deleted_by_field(), None);
        assert_eq!(settings.revision_column(), "rev");

        settings.mark_reverted("Post", &Identifier::from(7));
        assert_eq!(settings.reverted().len(), 1);
        assert_eq!(settings.reverted()[0].0, "Post");
    }
}
