//! Collaborator traits: the seams between the engine and its host.
//!
//! The engine reads metadata, resolves live relations, hands off changesets
//! and consults audit settings only through these traits. Shipped
//! implementations live in [`crate::catalog`], [`crate::resolver`],
//! [`crate::tracker`] and [`crate::settings`].

use rewind_core::changeset::Changeset;
use rewind_core::entity::{Entity, EntityRef, LazyCollection, Reference};
use rewind_core::identifier::Identifier;
use rewind_core::metadata::{AssociationMapping, EntityMetadata};

use crate::error::AuditError;

/// Read-only source of entity metadata.
pub trait MetadataCatalog {
    /// Whether the type is known to the persistence layer as a tracked entity.
    fn is_tracked(&self, entity_type: &str) -> bool;

    fn metadata_for(&self, entity_type: &str) -> Option<&EntityMetadata>;

    /// Metadata for a type that must exist.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::UnknownEntityType` if the catalog has no entry.
    fn require(&self, entity_type: &str) -> Result<&EntityMetadata, AuditError> {
        self.metadata_for(entity_type)
            .ok_or_else(|| AuditError::UnknownEntityType(entity_type.to_string()))
    }

    /// True if `entity_type` is `ancestor` or inherits from it.
    fn is_subtype_of(&self, entity_type: &str, ancestor: &str) -> bool {
        let mut current = Some(entity_type);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self
                .metadata_for(name)
                .and_then(|meta| meta.parent.as_deref());
        }
        false
    }

    /// Nearest type in the hierarchy (starting at `entity_type`) that
    /// declares a discriminator.
    fn discriminator_root(&self, entity_type: &str) -> Option<&EntityMetadata> {
        let mut current = self.metadata_for(entity_type);
        while let Some(meta) = current {
            if meta.discriminator.is_some() {
                return Some(meta);
            }
            current = meta.parent.as_deref().and_then(|p| self.metadata_for(p));
        }
        None
    }
}

/// The live persistence layer's view of associations.
pub trait RelationResolver {
    /// Placeholder for an owning-side target, dereferenced on demand.
    fn lazy_reference(&self, target_type: &str, identifier: Identifier) -> Reference {
        Reference::new(target_type, identifier)
    }

    /// Current (not historical) object on the other side of an inverse
    /// to-one, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuditError` if the live lookup fails.
    fn load_inverse_to_one(
        &self,
        association: &AssociationMapping,
        owner: &EntityRef,
    ) -> Result<Option<EntityRef>, AuditError>;

    /// Uninitialized collection backed by live state.
    fn load_one_to_many_lazy(&self, association: &AssociationMapping, owner: &Reference) -> LazyCollection {
        LazyCollection {
            owner: owner.clone(),
            association: association.name.clone(),
            target_type: association.target_type.clone(),
        }
    }

    /// Drop the working set for a type so historical instances never
    /// collide with live ones.
    fn clear(&self, entity_type: &str);
}

/// Receives restored objects as deferred partial updates.
pub trait ChangeTracker {
    fn schedule_deferred_update(&mut self, entity: &Entity, changeset: &Changeset);
}

/// Audit naming and bookkeeping.
pub trait AuditConfiguration {
    fn table_name_for(&self, base_table: &str) -> String;

    fn is_logged(&self, entity_type: &str) -> bool;

    fn deleted_at_field(&self) -> Option<&str>;

    fn deleted_by_field(&self) -> Option<&str>;

    fn mark_reverted(&mut self, entity_type: &str, identifier: &Identifier);

    fn revision_column(&self) -> &str;

    fn revision_type_column(&self) -> &str;
}
