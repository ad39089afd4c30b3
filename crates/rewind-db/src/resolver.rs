//! Relation resolver for use without a live persistence session.

use rewind_core::entity::EntityRef;
use rewind_core::metadata::AssociationMapping;

use crate::error::AuditError;
use crate::ports::RelationResolver;

/// Resolver with no live session: owning targets become plain references,
/// inverse to-ones are absent, collections stay unloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedResolver;

impl RelationResolver for DetachedResolver {
    fn load_inverse_to_one(
        &self,
        _association: &AssociationMapping,
        _owner: &EntityRef,
    ) -> Result<Option<EntityRef>, AuditError> {
        Ok(None)
    }

    fn clear(&self, entity_type: &str) {
        tracing::trace!(entity_type, "no live working set to clear");
    }
}
