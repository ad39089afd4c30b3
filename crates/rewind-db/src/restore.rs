//! Restore Engine: diff a live object against a historical one, apply the
//! difference, and hand it to the change tracker.

use rewind_core::changeset::Changeset;
use rewind_core::entity::{Entity, FieldValue};
use rewind_core::metadata::{AssociationKind, EntityMetadata};
use rewind_core::revision::HistoryRevision;
use rewind_core::value::Value;

use crate::error::AuditError;
use crate::ports::{AuditConfiguration, ChangeTracker, MetadataCatalog};

pub struct RestoreEngine<'a, C: MetadataCatalog> {
    catalog: &'a C,
}

impl<'a, C: MetadataCatalog> RestoreEngine<'a, C> {
    pub const fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Members of `target` that differ from `live`, as `(live, target)`.
    ///
    /// Every scalar field and association declared for the live object's
    /// type is compared. An unset scalar counts as `NULL` and an unset
    /// to-one as absent; collections are only compared when both sides
    /// carry one.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::UnknownEntityType` if the live type is not
    /// catalogued.
    pub fn diff(&self, live: &Entity, target: &Entity) -> Result<Changeset, AuditError> {
        let meta = self.catalog.require(live.entity_type())?;
        let mut changes = Changeset::new();

        for field in &meta.fields {
            let old = member_or_absent(live, &field.name, false);
            let new = member_or_absent(target, &field.name, false);
            if old != new {
                changes.record(field.name.as_str(), old, new);
            }
        }

        for assoc in &meta.associations {
            if assoc.kind == AssociationKind::OneToMany {
                if let (Some(old), Some(new)) = (live.get(&assoc.name), target.get(&assoc.name)) {
                    if old != new {
                        changes.record(assoc.name.as_str(), old.clone(), new.clone());
                    }
                }
                continue;
            }
            let old = member_or_absent(live, &assoc.name, true);
            let new = member_or_absent(target, &assoc.name, true);
            if !self.same_target(&old, &new) {
                changes.record(assoc.name.as_str(), old, new);
            }
        }

        Ok(changes)
    }

    /// To-one targets match when they share an identity within one type
    /// hierarchy, so a live subtype instance equals a reference typed as its
    /// parent.
    fn same_target(&self, old: &FieldValue, new: &FieldValue) -> bool {
        match (old.as_related(), new.as_related()) {
            (Some(old), Some(new)) => {
                old.identifier().key() == new.identifier().key()
                    && self.hierarchy_root(&old.entity_type()) == self.hierarchy_root(&new.entity_type())
            }
            _ => old == new,
        }
    }

    fn hierarchy_root(&self, entity_type: &str) -> String {
        let mut root = entity_type.to_string();
        while let Some(parent) = self
            .catalog
            .metadata_for(&root)
            .and_then(|meta| meta.parent.clone())
        {
            root = parent;
        }
        root
    }

    /// Revert `live` to `target`, mutating it in place.
    ///
    /// The changeset holds exactly the members whose value differs, plus the
    /// configured deletion markers when `target` is a deletion. A non-empty
    /// changeset is scheduled as a deferred partial update; the identity is
    /// marked reverted either way.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::IdentityMismatch` if `target` belongs to another
    /// identity, `AuditError::NotLogged` if the type is not audited, and
    /// `AuditError::UnknownEntityType` if it is not catalogued.
    pub fn restore<A, T>(
        &self,
        settings: &mut A,
        tracker: &mut T,
        live: &mut Entity,
        target: &HistoryRevision,
    ) -> Result<Changeset, AuditError>
    where
        A: AuditConfiguration,
        T: ChangeTracker,
    {
        let entity_type = live.entity_type().to_string();
        if !settings.is_logged(&entity_type) {
            return Err(AuditError::NotLogged(entity_type));
        }
        if live.identifier() != target.identifier() {
            return Err(AuditError::IdentityMismatch {
                entity_type,
                live: live.identifier().to_string(),
                target: target.identifier().to_string(),
            });
        }

        let meta = self.catalog.require(&entity_type)?;
        let mut changes = self.diff(live, &target.entity().borrow())?;

        if target.kind().is_delete() {
            let markers = [settings.deleted_at_field(), settings.deleted_by_field()];
            for marker in markers.into_iter().flatten() {
                if let Some(cleared) = cleared_marker(meta, marker) {
                    let is_association = meta.association(marker).is_some();
                    let old = member_or_absent(live, marker, is_association);
                    changes.record(marker, old, cleared);
                }
            }
        }

        for (name, change) in changes.iter() {
            live.set(name, change.new.clone());
        }

        if changes.is_empty() {
            tracing::debug!(
                entity_type = entity_type.as_str(),
                identifier = %live.identifier(),
                "live object already matches revision"
            );
        } else {
            tracker.schedule_deferred_update(live, &changes);
        }
        settings.mark_reverted(&entity_type, live.identifier());

        tracing::info!(
            entity_type = entity_type.as_str(),
            identifier = %live.identifier(),
            revision = target.revision(),
            fields = changes.len(),
            "restored live object"
        );
        Ok(changes)
    }
}

fn member_or_absent(entity: &Entity, name: &str, is_association: bool) -> FieldValue {
    entity.get(name).cloned().unwrap_or(if is_association {
        FieldValue::ToOne(None)
    } else {
        FieldValue::Scalar(Value::Null)
    })
}

/// Absent value for a deletion marker, `None` if the type does not declare it.
fn cleared_marker(meta: &EntityMetadata, marker: &str) -> Option<FieldValue> {
    if meta.field(marker).is_some() {
        return Some(FieldValue::Scalar(Value::Null));
    }
    meta.association(marker)
        .filter(|assoc| assoc.kind.is_to_one())
        .map(|_| FieldValue::ToOne(None))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rewind_core::entity::{Reference, Related};
    use rewind_core::identifier::Identifier;
    use rewind_core::revision::RevisionKind;

    use super::*;
    use crate::settings::AuditSettings;
    use crate::test_support::fixtures;
    use crate::tracker::DeferredUpdates;

    fn live_post() -> Entity {
        Entity::new("Post", Identifier::from(1))
            .with("id", Value::Integer(1))
            .with("title", Value::from("current"))
            .with("body", Value::from("body"))
            .with("published", Value::Bool(true))
            .with("rating", Value::Float(3.0))
            .with("deleted_at", Value::Null)
            .with("deleted_by", Value::Null)
            .with("author", Reference::new("User", Identifier::from(10)))
    }

    fn revision(kind: RevisionKind, entity: Entity) -> HistoryRevision {
        HistoryRevision::new(2, kind, entity.identifier().clone(), entity.into_ref())
    }

    #[test]
    fn changeset_contains_exactly_differing_members() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = fixtures::settings();
        let mut tracker = DeferredUpdates::new();

        let mut live = live_post();
        let target = live_post()
            .with("title", Value::from("old title"))
            .with("author", Reference::new("User", Identifier::from(11)));

        let changes = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Update, target))
            .unwrap();

        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["author", "title"]);
        let title = changes.get("title").unwrap();
        assert_eq!(title.old, FieldValue::Scalar(Value::from("current")));
        assert_eq!(title.new, FieldValue::Scalar(Value::from("old title")));
        assert_eq!(live.scalar("title"), Some(&Value::from("old title")));
        assert_eq!(
            live.related("author").map(Related::identifier),
            Some(Identifier::from(11))
        );
        assert_eq!(live.scalar("body"), Some(&Value::from("body")));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.pending()[0].changeset, changes);
        assert_eq!(settings.reverted(), &[("Post".to_string(), Identifier::from(1))]);
    }

    #[test]
    fn undelete_clears_markers_even_when_target_differs() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = fixtures::settings();
        let mut tracker = DeferredUpdates::new();

        let mut live = live_post();
        let target = live_post()
            .with("deleted_at", Value::from("2026-03-01T00:00:00Z"))
            .with("deleted_by", Value::from("alice"));

        let changes = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Delete, target))
            .unwrap();

        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["deleted_at", "deleted_by"]);
        let deleted_at = changes.get("deleted_at").unwrap();
        assert_eq!(deleted_at.old, FieldValue::Scalar(Value::Null));
        assert_eq!(deleted_at.new, FieldValue::Scalar(Value::Null));
        assert_eq!(live.scalar("deleted_at"), Some(&Value::Null));
        assert_eq!(live.scalar("deleted_by"), Some(&Value::Null));
    }

    #[test]
    fn delete_target_with_matching_fields_still_clears_markers() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = fixtures::settings();
        let mut tracker = DeferredUpdates::new();

        let mut live = live_post();
        let changes = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Delete, live_post()))
            .unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn update_target_does_not_touch_markers() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = fixtures::settings();
        let mut tracker = DeferredUpdates::new();

        let mut live = live_post();
        let changes = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Update, live_post()))
            .unwrap();

        assert!(changes.is_empty());
        assert!(tracker.is_empty());
        assert_eq!(settings.reverted().len(), 1);
    }

    #[test]
    fn undeclared_markers_are_ignored() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = AuditSettings::from(rewind_config::AuditConfig {
            deleted_at_field: Some("removed_on".into()),
            ..fixtures::audit_config()
        });
        let mut tracker = DeferredUpdates::new();

        let mut live = live_post();
        let changes = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Delete, live_post()))
            .unwrap();

        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["deleted_by"]);
    }

    #[test]
    fn mismatched_identity_is_rejected() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = fixtures::settings();
        let mut tracker = DeferredUpdates::new();

        let mut live = live_post();
        let other = Entity::new("Post", Identifier::from(2));
        let err = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Update, other))
            .unwrap_err();

        assert!(matches!(err, AuditError::IdentityMismatch { .. }));
        assert!(settings.reverted().is_empty());
        assert_eq!(live.scalar("title"), Some(&Value::from("current")));
    }

    #[test]
    fn unaudited_type_is_rejected() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);
        let mut settings = fixtures::settings();
        let mut tracker = DeferredUpdates::new();

        let mut live = Entity::new("User", Identifier::from(1));
        let target = Entity::new("User", Identifier::from(1));
        let err = engine
            .restore(&mut settings, &mut tracker, &mut live, &revision(RevisionKind::Update, target))
            .unwrap_err();
        assert!(matches!(err, AuditError::NotLogged(ref t) if t == "User"));
    }

    #[test]
    fn retargeting_to_another_type_is_a_change() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);

        let live = live_post();
        let target = live_post().with("author", Reference::new("Comment", Identifier::from(10)));

        let changes = engine.diff(&live, &target).unwrap();
        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["author"]);
    }

    #[test]
    fn subtype_target_matches_reference_to_its_parent() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);

        let live = live_post().with("author", Reference::new("Car", Identifier::from(4)));
        let target = live_post().with("author", Reference::new("Vehicle", Identifier::from(4)));

        assert!(engine.diff(&live, &target).unwrap().is_empty());
    }

    #[test]
    fn diff_treats_unset_members_as_absent() {
        let catalog = fixtures::catalog();
        let engine = RestoreEngine::new(&catalog);

        let sparse = Entity::new("Post", Identifier::from(1)).with("title", Value::from("x"));
        let full = Entity::new("Post", Identifier::from(1))
            .with("title", Value::from("x"))
            .with("body", Value::Null)
            .with("author", FieldValue::ToOne(None));

        assert!(engine.diff(&sparse, &full).unwrap().is_empty());
    }
}
