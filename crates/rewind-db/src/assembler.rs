//! Revision Assembler: raw audit rows → [`HistoryCollection`].

use rewind_core::revision::{HistoryCollection, HistoryRevision, RevisionKind};
use rewind_core::value::RawValue;

use crate::error::AuditError;
use crate::helpers::parse_revision;
use crate::hydrator::{EntityHydrator, HydrationCache};
use crate::ports::{MetadataCatalog, RelationResolver};
use crate::source::RawRow;

pub struct RevisionAssembler<'a, C: MetadataCatalog, R: RelationResolver> {
    catalog: &'a C,
    resolver: &'a R,
    revision_column: &'a str,
    revision_type_column: &'a str,
}

impl<'a, C: MetadataCatalog, R: RelationResolver> RevisionAssembler<'a, C, R> {
    pub const fn new(
        catalog: &'a C,
        resolver: &'a R,
        revision_column: &'a str,
        revision_type_column: &'a str,
    ) -> Self {
        Self {
            catalog,
            resolver,
            revision_column,
            revision_type_column,
        }
    }

    /// Hydrate every row and group the revisions by identity, keeping row
    /// order within each group.
    ///
    /// One hydration cache serves the whole call and is dropped with it.
    /// After a successful pass the resolver's working set for `entity_type`
    /// is cleared.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::MissingColumn` or `AuditError::InvalidRevision`
    /// for a row without usable revision columns, and propagates every
    /// hydration error.
    pub fn assemble(&self, entity_type: &str, rows: Vec<RawRow>) -> Result<HistoryCollection, AuditError> {
        let hydrator = EntityHydrator::new(self.catalog, self.resolver);
        let mut cache = HydrationCache::new();
        let mut collection = HistoryCollection::new();

        for mut row in rows {
            let (revision, kind) = self.strip_revision_columns(&mut row)?;
            let entity = hydrator.hydrate(entity_type, &row, revision, &mut cache)?;
            let identifier = entity.borrow().identifier().clone();
            collection.push(HistoryRevision::new(revision, kind, identifier, entity));
        }

        self.resolver.clear(entity_type);
        tracing::debug!(
            entity_type,
            identities = collection.len(),
            revisions = collection.total(),
            "assembled history"
        );
        Ok(collection)
    }

    fn strip_revision_columns(&self, row: &mut RawRow) -> Result<(i64, RevisionKind), AuditError> {
        let raw_revision = row
            .take(self.revision_column)
            .ok_or_else(|| AuditError::MissingColumn(self.revision_column.to_string()))?;
        let revision = parse_revision(&raw_revision, self.revision_column)?;

        let kind = match row.take(self.revision_type_column) {
            Some(RawValue::Text(marker)) => marker.parse::<RevisionKind>()?,
            Some(other) => other.to_string().parse::<RevisionKind>()?,
            None => return Err(AuditError::MissingColumn(self.revision_type_column.to_string())),
        };
        Ok((revision, kind))
    }
}
