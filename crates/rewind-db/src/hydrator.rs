//! Entity Hydrator: one raw audit row → one typed entity graph.
//!
//! Every instance is registered in the pass's [`HydrationCache`] before any
//! of its members are populated, so an association path that leads back to
//! the same `(type, identity, revision)` observes the instance already being
//! built instead of starting a second hydration.

use std::collections::HashMap;

use rewind_core::entity::{Entity, EntityRef, FieldValue, Related};
use rewind_core::identifier::Identifier;
use rewind_core::metadata::{AssociationKind, AssociationMapping, EntityMetadata};
use rewind_core::storage::raw_to_value;
use rewind_core::value::{RawValue, Value};

use crate::error::{AuditError, HydrationDefect};
use crate::ports::{MetadataCatalog, RelationResolver};
use crate::source::RawRow;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    entity_type: String,
    identifier: String,
    revision: i64,
}

impl CacheKey {
    fn new(entity_type: &str, identifier: &str, revision: i64) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            identifier: identifier.to_string(),
            revision,
        }
    }
}

/// Instances built during one hydration pass, keyed by
/// `(entity type, identifier key, revision)`.
///
/// Create one per pass and drop it afterwards; entries from unrelated
/// queries would otherwise be conflated by identity and revision.
#[derive(Debug, Default)]
pub struct HydrationCache {
    entries: HashMap<CacheKey, EntityRef>,
}

impl HydrationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, entity_type: &str, identifier_key: &str, revision: i64) -> Option<EntityRef> {
        self.entries
            .get(&CacheKey::new(entity_type, identifier_key, revision))
            .cloned()
    }

    pub fn insert(&mut self, entity_type: &str, identifier_key: &str, revision: i64, entity: EntityRef) {
        self.entries
            .insert(CacheKey::new(entity_type, identifier_key, revision), entity);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct EntityHydrator<'a, C: MetadataCatalog, R: RelationResolver> {
    catalog: &'a C,
    resolver: &'a R,
}

impl<'a, C: MetadataCatalog, R: RelationResolver> EntityHydrator<'a, C, R> {
    pub const fn new(catalog: &'a C, resolver: &'a R) -> Self {
        Self { catalog, resolver }
    }

    /// Hydrate `row` as `entity_type` at `revision`.
    ///
    /// Returns the cached instance when the same identity and revision were
    /// already hydrated in this pass.
    ///
    /// # Errors
    ///
    /// - `AuditError::Hydration` for discriminator defects (missing or
    ///   unmapped value, abstract type without a discriminator value).
    /// - `AuditError::MissingColumn` if an identifier column is absent.
    /// - `AuditError::Core` if a column cannot be converted to its storage type.
    /// - Any error raised by the relation resolver.
    pub fn hydrate(
        &self,
        entity_type: &str,
        row: &RawRow,
        revision: i64,
        cache: &mut HydrationCache,
    ) -> Result<EntityRef, AuditError> {
        let meta = self.catalog.require(entity_type)?;
        let identifier = identifier_from_row(meta, row)?;
        let key = identifier.key();

        if let Some(hit) = cache.get(entity_type, &key, revision) {
            return Ok(hit);
        }

        let concrete = self.resolve_concrete(meta, row)?;
        let entity = Entity::new(concrete.name.clone(), identifier).into_ref();

        cache.insert(entity_type, &key, revision, entity.clone());
        if concrete.name != entity_type {
            cache.insert(&concrete.name, &key, revision, entity.clone());
        }

        for field in &concrete.fields {
            let value = field.storage_type.convert(row.get_or_null(&field.column))?;
            entity.borrow_mut().set(field.name.as_str(), value);
        }

        for assoc in &concrete.associations {
            let value = match assoc.kind {
                AssociationKind::ToOneOwning => FieldValue::ToOne(self.owning_target(assoc, row)?),
                // Live state: history only records the owning side.
                AssociationKind::ToOneInverse => FieldValue::ToOne(
                    self.resolver
                        .load_inverse_to_one(assoc, &entity)?
                        .map(Related::Loaded),
                ),
                AssociationKind::OneToMany => {
                    let owner = entity.borrow().reference();
                    FieldValue::ToMany(self.resolver.load_one_to_many_lazy(assoc, &owner))
                }
            };
            entity.borrow_mut().set(assoc.name.as_str(), value);
        }

        Ok(entity)
    }

    /// Concrete metadata for a row, following the discriminator when the
    /// hierarchy declares one.
    fn resolve_concrete(
        &self,
        meta: &'a EntityMetadata,
        row: &RawRow,
    ) -> Result<&'a EntityMetadata, AuditError> {
        let Some(root) = self.catalog.discriminator_root(&meta.name) else {
            if meta.is_abstract {
                return Err(defect(HydrationDefect::AbstractWithoutDiscriminator {
                    entity_type: meta.name.clone(),
                    concrete_type: meta.name.clone(),
                }));
            }
            return Ok(meta);
        };
        let Some(discriminator) = root.discriminator.as_ref() else {
            return Ok(meta);
        };

        let value = match row.get(&discriminator.column) {
            None | Some(RawValue::Null) => {
                return Err(defect(HydrationDefect::MissingDiscriminator {
                    entity_type: meta.name.clone(),
                    column: discriminator.column.clone(),
                }));
            }
            Some(RawValue::Text(s)) => s.clone(),
            Some(RawValue::Integer(n)) => n.to_string(),
            Some(RawValue::Real(x)) => x.to_string(),
            Some(blob @ RawValue::Blob(_)) => {
                return Err(defect(HydrationDefect::UnmappedDiscriminator {
                    entity_type: meta.name.clone(),
                    value: blob.to_string(),
                }));
            }
        };

        let Some(concrete_type) = discriminator.resolve(&value) else {
            return Err(defect(HydrationDefect::UnmappedDiscriminator {
                entity_type: meta.name.clone(),
                value,
            }));
        };

        let concrete = self.catalog.require(concrete_type)?;
        if concrete.is_abstract && concrete.discriminator_value.is_none() {
            return Err(defect(HydrationDefect::AbstractWithoutDiscriminator {
                entity_type: meta.name.clone(),
                concrete_type: concrete.name.clone(),
            }));
        }
        Ok(concrete)
    }

    /// Lazy reference to the target of an owning to-one, absent when any
    /// join column is `NULL`.
    fn owning_target(&self, assoc: &AssociationMapping, row: &RawRow) -> Result<Option<Related>, AuditError> {
        let target = self.catalog.metadata_for(&assoc.target_type);
        let mut values = Vec::with_capacity(assoc.join_columns.len());

        for join in &assoc.join_columns {
            let raw = row.get_or_null(&join.name);
            if raw.is_null() {
                return Ok(None);
            }
            let referenced = target.and_then(|t| t.fields.iter().find(|f| f.column == join.referenced_column));
            let value = match referenced {
                Some(field) => field.storage_type.convert(raw)?,
                None => raw_to_value(raw),
            };
            values.push(value);
        }

        let reference = self
            .resolver
            .lazy_reference(&assoc.target_type, Identifier::new(values));
        Ok(Some(Related::Reference(reference)))
    }
}

/// Identifier values from `row`, in the metadata's declared order.
///
/// # Errors
///
/// Returns `AuditError::MissingColumn` if an identifier column is absent and
/// `AuditError::Core` if one cannot be converted.
pub fn identifier_from_row(meta: &EntityMetadata, row: &RawRow) -> Result<Identifier, AuditError> {
    let mut values: Vec<Value> = Vec::with_capacity(meta.identifier.len());
    for field in meta.identifier_fields() {
        let raw = row
            .get(&field.column)
            .ok_or_else(|| AuditError::MissingColumn(field.column.clone()))?;
        values.push(field.storage_type.convert(raw)?);
    }
    Ok(Identifier::new(values))
}

fn defect(defect: HydrationDefect) -> AuditError {
    tracing::warn!(%defect, "metadata and audit schema disagree");
    AuditError::Hydration(defect)
}
