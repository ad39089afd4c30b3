//! Entity metadata: identifiers, scalar fields, associations, and
//! discriminator maps.
//!
//! Metadata is read-only once built. A catalog hands it to the engine per
//! entity type; the engine never mutates it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::storage::StorageType;

/// A scalar field and the column it is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub column: String,
    pub storage_type: StorageType,
}

/// Kind of an association, seen from the entity that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// To-one whose foreign key lives in this entity's table.
    ToOneOwning,
    /// To-one whose foreign key lives in the target's table.
    ToOneInverse,
    OneToMany,
}

impl AssociationKind {
    #[must_use]
    pub const fn is_to_one(self) -> bool {
        matches!(self, Self::ToOneOwning | Self::ToOneInverse)
    }
}

/// A foreign-key column and the target column it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub name: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationMapping {
    pub name: String,
    pub kind: AssociationKind,
    pub target_type: String,
    /// Only populated for [`AssociationKind::ToOneOwning`], in the target's
    /// identifier order.
    pub join_columns: Vec<JoinColumn>,
    /// Field on the target that owns the relation (inverse and to-many sides).
    pub mapped_by: Option<String>,
}

/// Discriminator column and value → concrete type map of a polymorphic root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminator {
    pub column: String,
    pub map: BTreeMap<String, String>,
}

impl Discriminator {
    /// Concrete type registered for a discriminator value.
    #[must_use]
    pub fn resolve(&self, value: &str) -> Option<&str> {
        self.map.get(value).map(String::as_str)
    }
}

/// Everything the engine needs to know about one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    /// Base table; for single-table hierarchies every member shares the root's table.
    pub table_name: String,
    pub parent: Option<String>,
    pub is_abstract: bool,
    /// Identifier field names, in key order.
    pub identifier: Vec<String>,
    pub fields: Vec<FieldMapping>,
    pub associations: Vec<AssociationMapping>,
    pub discriminator: Option<Discriminator>,
    /// This type's own entry in the discriminator map, if any.
    pub discriminator_value: Option<String>,
}

impl EntityMetadata {
    #[must_use]
    pub fn builder(name: impl Into<String>, table_name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder::new(name, table_name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn association(&self, name: &str) -> Option<&AssociationMapping> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Field mappings of the identifier, in key order.
    pub fn identifier_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.identifier.iter().filter_map(|name| self.field(name))
    }

    /// Identifier column names, in key order.
    #[must_use]
    pub fn identifier_columns(&self) -> Vec<&str> {
        self.identifier_fields().map(|f| f.column.as_str()).collect()
    }

    #[must_use]
    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifier.iter().any(|name| name == field)
    }
}

/// Builder for [`EntityMetadata`].
pub struct EntityMetadataBuilder(EntityMetadata);

impl EntityMetadataBuilder {
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self(EntityMetadata {
            name: name.into(),
            table_name: table_name.into(),
            parent: None,
            is_abstract: false,
            identifier: Vec::new(),
            fields: Vec::new(),
            associations: Vec::new(),
            discriminator: None,
            discriminator_value: None,
        })
    }

    /// Declare an identifier field (stored in a column of the same name).
    #[must_use]
    pub fn id(mut self, name: &str, storage_type: StorageType) -> Self {
        self.0.identifier.push(name.to_string());
        self.field(name, storage_type)
    }

    /// Declare a scalar field stored in a column of the same name.
    #[must_use]
    pub fn field(self, name: &str, storage_type: StorageType) -> Self {
        self.field_column(name, name, storage_type)
    }

    #[must_use]
    pub fn field_column(mut self, name: &str, column: &str, storage_type: StorageType) -> Self {
        self.0.fields.push(FieldMapping {
            name: name.to_string(),
            column: column.to_string(),
            storage_type,
        });
        self
    }

    /// Owning to-one; `join_columns` pairs are `(local column, referenced column)`.
    #[must_use]
    pub fn to_one(mut self, name: &str, target_type: &str, join_columns: &[(&str, &str)]) -> Self {
        self.0.associations.push(AssociationMapping {
            name: name.to_string(),
            kind: AssociationKind::ToOneOwning,
            target_type: target_type.to_string(),
            join_columns: join_columns
                .iter()
                .map(|(name, referenced)| JoinColumn {
                    name: (*name).to_string(),
                    referenced_column: (*referenced).to_string(),
                })
                .collect(),
            mapped_by: None,
        });
        self
    }

    #[must_use]
    pub fn inverse_to_one(mut self, name: &str, target_type: &str, mapped_by: &str) -> Self {
        self.0.associations.push(AssociationMapping {
            name: name.to_string(),
            kind: AssociationKind::ToOneInverse,
            target_type: target_type.to_string(),
            join_columns: Vec::new(),
            mapped_by: Some(mapped_by.to_string()),
        });
        self
    }

    #[must_use]
    pub fn one_to_many(mut self, name: &str, target_type: &str, mapped_by: &str) -> Self {
        self.0.associations.push(AssociationMapping {
            name: name.to_string(),
            kind: AssociationKind::OneToMany,
            target_type: target_type.to_string(),
            join_columns: Vec::new(),
            mapped_by: Some(mapped_by.to_string()),
        });
        self
    }

    /// Declare the discriminator column and its value → type map.
    #[must_use]
    pub fn discriminator(mut self, column: &str, map: &[(&str, &str)]) -> Self {
        self.0.discriminator = Some(Discriminator {
            column: column.to_string(),
            map: map
                .iter()
                .map(|(value, ty)| ((*value).to_string(), (*ty).to_string()))
                .collect(),
        });
        self
    }

    #[must_use]
    pub fn discriminator_value(mut self, value: &str) -> Self {
        self.0.discriminator_value = Some(value.to_string());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: &str) -> Self {
        self.0.parent = Some(parent.to_string());
        self
    }

    #[must_use]
    pub const fn abstract_type(mut self) -> Self {
        self.0.is_abstract = true;
        self
    }

    /// Validate and finish.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidMetadata` if the type has no identifier,
    /// an identifier names an undeclared field, a member name is declared
    /// twice, or an owning to-one has no join column.
    pub fn build(self) -> Result<EntityMetadata, CoreError> {
        let meta = self.0;
        let invalid = |reason: String| CoreError::InvalidMetadata {
            entity_type: meta.name.clone(),
            reason,
        };

        if meta.identifier.is_empty() {
            return Err(invalid("no identifier declared".into()));
        }
        for id in &meta.identifier {
            if meta.field(id).is_none() {
                return Err(invalid(format!("identifier '{id}' is not a declared field")));
            }
        }

        let mut seen = std::collections::HashSet::new();
        let names = meta
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(meta.associations.iter().map(|a| a.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                return Err(invalid(format!("member '{name}' declared twice")));
            }
        }

        for assoc in &meta.associations {
            if assoc.kind == AssociationKind::ToOneOwning && assoc.join_columns.is_empty() {
                return Err(invalid(format!(
                    "owning association '{}' has no join column",
                    assoc.name
                )));
            }
        }

        Ok(meta)
    }
}
