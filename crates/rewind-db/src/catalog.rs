//! In-memory metadata catalog.

use std::collections::HashMap;

use rewind_core::metadata::EntityMetadata;

use crate::ports::MetadataCatalog;

/// Catalog over a fixed set of [`EntityMetadata`] values.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, EntityMetadata>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type's metadata.
    pub fn register(&mut self, metadata: EntityMetadata) {
        self.entries.insert(metadata.name.clone(), metadata);
    }

    /// Builder-style [`StaticCatalog::register`].
    #[must_use]
    pub fn with(mut self, metadata: EntityMetadata) -> Self {
        self.register(metadata);
        self
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn entity_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `entity_type` and every registered type inheriting from it.
    #[must_use]
    pub fn descendants(&self, entity_type: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .map(String::as_str)
            .filter(|name| self.is_subtype_of(name, entity_type))
            .collect();
        names.sort_unstable();
        names
    }
}

impl MetadataCatalog for StaticCatalog {
    fn is_tracked(&self, entity_type: &str) -> bool {
        self.entries.contains_key(entity_type)
    }

    fn metadata_for(&self, entity_type: &str) -> Option<&EntityMetadata> {
        self.entries.get(entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    #[test]
    fn hierarchy_queries() {
        let catalog = fixtures::catalog();

        assert!(catalog.is_subtype_of("Car", "Vehicle"));
        assert!(catalog.is_subtype_of("Vehicle", "Vehicle"));
        assert!(!catalog.is_subtype_of("Vehicle", "Car"));
        assert!(!catalog.is_subtype_of("Post", "Vehicle"));
        assert_eq!(catalog.descendants("Vehicle"), vec!["Bus", "Car", "Truck", "Vehicle"]);
        assert_eq!(catalog.descendants("Car"), vec!["Car"]);
    }

    #[test]
    fn discriminator_root_walks_parents() {
        let catalog = fixtures::catalog();
        assert_eq!(catalog.discriminator_root("Truck").unwrap().name, "Vehicle");
        assert!(catalog.discriminator_root("Post").is_none());
    }

    #[test]
    fn require_reports_unknown_type() {
        let catalog = StaticCatalog::new();
        let err = catalog.require("Ghost").unwrap_err();
        assert_eq!(err.to_string(), "Unknown entity type: Ghost");
        assert!(!catalog.is_tracked("Ghost"));
    }
}
