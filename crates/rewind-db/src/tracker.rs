//! Change tracker that queues partial updates for the caller to flush.

use rewind_core::changeset::Changeset;
use rewind_core::entity::Entity;
use rewind_core::identifier::Identifier;

use crate::ports::ChangeTracker;

/// A scheduled partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub entity_type: String,
    pub identifier: Identifier,
    pub changeset: Changeset,
}

#[derive(Debug, Clone, Default)]
pub struct DeferredUpdates {
    pending: Vec<PendingUpdate>,
}

impl DeferredUpdates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending(&self) -> &[PendingUpdate] {
        &self.pending
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued update, oldest first.
    pub fn drain(&mut self) -> Vec<PendingUpdate> {
        std::mem::take(&mut self.pending)
    }
}

impl ChangeTracker for DeferredUpdates {
    fn schedule_deferred_update(&mut self, entity: &Entity, changeset: &Changeset) {
        tracing::debug!(
            entity_type = entity.entity_type(),
            identifier = %entity.identifier(),
            fields = changeset.len(),
            "scheduled partial update"
        );
        self.pending.push(PendingUpdate {
            entity_type: entity.entity_type().to_string(),
            identifier: entity.identifier().clone(),
            changeset: changeset.clone(),
        });
    }
}
