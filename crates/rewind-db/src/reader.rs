//! Audit reader: the public query surface over audit tables.
//!
//! Every lookup builds a parameterized `SELECT` against the type's audit
//! table, runs it through the [`RowSource`], and assembles the rows into
//! hydrated revisions. Restores go through the [`RestoreEngine`].

use rewind_core::changeset::Changeset;
use rewind_core::entity::Entity;
use rewind_core::errors::CoreError;
use rewind_core::identifier::Identifier;
use rewind_core::metadata::EntityMetadata;
use rewind_core::revision::{HistoryCollection, HistoryRevision};
use rewind_core::value::RawValue;

use crate::assembler::RevisionAssembler;
use crate::criteria::{Criteria, CriteriaTranslator, SqlFilter, order_by_identifier_desc};
use crate::error::AuditError;
use crate::helpers::{parse_revision, quote_ident};
use crate::ports::{AuditConfiguration, ChangeTracker, MetadataCatalog, RelationResolver};
use crate::restore::RestoreEngine;
use crate::source::{RawRow, RowSource};

pub struct AuditReader<S, C, R, A>
where
    S: RowSource,
    C: MetadataCatalog,
    R: RelationResolver,
    A: AuditConfiguration,
{
    source: S,
    catalog: C,
    resolver: R,
    settings: A,
}

impl<S, C, R, A> AuditReader<S, C, R, A>
where
    S: RowSource,
    C: MetadataCatalog,
    R: RelationResolver,
    A: AuditConfiguration,
{
    pub const fn new(source: S, catalog: C, resolver: R, settings: A) -> Self {
        Self {
            source,
            catalog,
            resolver,
            settings,
        }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    pub const fn settings(&self) -> &A {
        &self.settings
    }

    /// Every revision of one identity, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::NotLogged` for untracked types,
    /// `AuditError::Core` for an identifier of the wrong arity, and any
    /// query or hydration error.
    pub async fn find_revisions(
        &self,
        entity_type: &str,
        identifier: &Identifier,
    ) -> Result<Vec<HistoryRevision>, AuditError> {
        let meta = self.audited_meta(entity_type)?;
        let filter = self.identity_filter(meta, identifier)?;
        let sql = format!(
            "{} ORDER BY {} DESC",
            self.select(meta, &filter),
            quote_ident(self.settings.revision_column())
        );

        let rows = self.run(&sql, filter.params()).await?;
        Ok(self.assemble(entity_type, rows)?.into_revisions())
    }

    /// The single revision `revision` of one identity.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::NotFound` when no row matches and
    /// `AuditError::TooManyFound` when several do, besides the errors of
    /// [`AuditReader::find_revisions`].
    pub async fn find_revision(
        &self,
        entity_type: &str,
        identifier: &Identifier,
        revision: i64,
    ) -> Result<HistoryRevision, AuditError> {
        let meta = self.audited_meta(entity_type)?;
        let mut filter = self.identity_filter(meta, identifier)?;
        filter.push_eq(self.settings.revision_column(), RawValue::Integer(revision));
        let sql = self.select(meta, &filter);

        let rows = self.run(&sql, filter.params()).await?;
        match rows.len() {
            0 => Err(AuditError::NotFound {
                entity_type: entity_type.to_string(),
                identifier: identifier.to_string(),
                revision,
            }),
            1 => self.single(entity_type, identifier, revision, rows),
            count => Err(AuditError::TooManyFound {
                entity_type: entity_type.to_string(),
                identifier: identifier.to_string(),
                revision,
                count,
            }),
        }
    }

    /// Revisions of every identity matching all `criteria`, ordered by
    /// identifier descending, then revision descending.
    ///
    /// Criteria are validated before any query runs.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::IncorrectCriteria` for a key that is not a
    /// queryable member, besides the errors of
    /// [`AuditReader::find_revisions`].
    pub async fn find_revisions_by_criteria(
        &self,
        entity_type: &str,
        criteria: &Criteria,
    ) -> Result<HistoryCollection, AuditError> {
        let meta = self.audited_meta(entity_type)?;
        let mut filter = SqlFilter::new();
        CriteriaTranslator::new(&self.catalog).translate_into(meta, criteria, &mut filter)?;
        self.push_subtype_filter(meta, &mut filter);
        let sql = format!(
            "{} {}",
            self.select(meta, &filter),
            order_by_identifier_desc(meta, self.settings.revision_column())
        );

        let rows = self.run(&sql, filter.params()).await?;
        self.assemble(entity_type, rows)
    }

    /// Highest revision number recorded for one identity.
    ///
    /// # Errors
    ///
    /// Same as [`AuditReader::find_revisions`].
    pub async fn current_revision(
        &self,
        entity_type: &str,
        identifier: &Identifier,
    ) -> Result<Option<i64>, AuditError> {
        let meta = self.audited_meta(entity_type)?;
        let filter = self.identity_filter(meta, identifier)?;
        let revision_column = self.settings.revision_column();
        let sql = format!(
            "SELECT MAX({col}) AS {col} FROM {} {}",
            quote_ident(&self.settings.table_name_for(&meta.table_name)),
            filter.where_clause(),
            col = quote_ident(revision_column),
        );

        let rows = self.run(&sql, filter.params()).await?;
        match rows.first().map(|row| row.get_or_null(revision_column)) {
            None | Some(RawValue::Null) => Ok(None),
            Some(raw) => parse_revision(raw, revision_column).map(Some),
        }
    }

    /// The newest revision numbered at most `revision`: the state the
    /// identity was in at that point.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::NotFound` if the identity has no revision that
    /// old, besides the errors of [`AuditReader::find_revisions`].
    pub async fn find_state_at(
        &self,
        entity_type: &str,
        identifier: &Identifier,
        revision: i64,
    ) -> Result<HistoryRevision, AuditError> {
        let meta = self.audited_meta(entity_type)?;
        let mut filter = self.identity_filter(meta, identifier)?;
        filter.push_at_most(self.settings.revision_column(), RawValue::Integer(revision));
        let sql = format!(
            "{} ORDER BY {} DESC LIMIT 1",
            self.select(meta, &filter),
            quote_ident(self.settings.revision_column())
        );

        let rows = self.run(&sql, filter.params()).await?;
        if rows.is_empty() {
            return Err(AuditError::NotFound {
                entity_type: entity_type.to_string(),
                identifier: identifier.to_string(),
                revision,
            });
        }
        self.single(entity_type, identifier, revision, rows)
    }

    /// Field-level difference from revision `from` to revision `to` of one
    /// identity. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// Same as [`AuditReader::find_revision`] for either revision.
    pub async fn diff_revisions(
        &self,
        entity_type: &str,
        identifier: &Identifier,
        from: i64,
        to: i64,
    ) -> Result<Changeset, AuditError> {
        let older = self.find_revision(entity_type, identifier, from).await?;
        let newer = self.find_revision(entity_type, identifier, to).await?;
        let engine = RestoreEngine::new(&self.catalog);
        engine.diff(&older.entity().borrow(), &newer.entity().borrow())
    }

    /// Revert `live` to a revision already loaded.
    ///
    /// # Errors
    ///
    /// See [`RestoreEngine::restore`].
    pub fn restore<T: ChangeTracker>(
        &mut self,
        tracker: &mut T,
        live: &mut Entity,
        target: &HistoryRevision,
    ) -> Result<Changeset, AuditError> {
        self.audited_meta(live.entity_type())?;
        RestoreEngine::new(&self.catalog).restore(&mut self.settings, tracker, live, target)
    }

    /// Load revision `revision` of `live`'s identity and revert `live` to it.
    ///
    /// # Errors
    ///
    /// Same as [`AuditReader::find_revision`] and [`AuditReader::restore`].
    pub async fn restore_to<T: ChangeTracker>(
        &mut self,
        tracker: &mut T,
        live: &mut Entity,
        revision: i64,
    ) -> Result<Changeset, AuditError> {
        let entity_type = live.entity_type().to_string();
        let identifier = live.identifier().clone();
        let target = self.find_revision(&entity_type, &identifier, revision).await?;
        self.restore(tracker, live, &target)
    }

    /// Metadata of a type whose history is recorded.
    fn audited_meta(&self, entity_type: &str) -> Result<&EntityMetadata, AuditError> {
        let meta = self.catalog.require(entity_type)?;
        if !self.catalog.is_tracked(entity_type) || !self.settings.is_logged(entity_type) {
            return Err(AuditError::NotLogged(entity_type.to_string()));
        }
        Ok(meta)
    }

    /// Equality on every identifier column, plus the subtype restriction.
    fn identity_filter(&self, meta: &EntityMetadata, identifier: &Identifier) -> Result<SqlFilter, AuditError> {
        if identifier.len() != meta.identifier.len() {
            return Err(CoreError::IdentifierArity {
                entity_type: meta.name.clone(),
                expected: meta.identifier.len(),
                actual: identifier.len(),
            }
            .into());
        }

        let mut filter = SqlFilter::new();
        for (field, value) in meta.identifier_fields().zip(identifier.values()) {
            filter.push_eq(&field.column, field.storage_type.to_raw(value)?);
        }
        self.push_subtype_filter(meta, &mut filter);
        Ok(filter)
    }

    /// Restrict a shared hierarchy table to rows of `meta`'s type and its
    /// descendants. No-op for hierarchy roots and plain types.
    fn push_subtype_filter(&self, meta: &EntityMetadata, filter: &mut SqlFilter) {
        let Some(root) = self.catalog.discriminator_root(&meta.name) else {
            return;
        };
        if root.name == meta.name {
            return;
        }
        let Some(discriminator) = &root.discriminator else {
            return;
        };

        let values = discriminator
            .map
            .iter()
            .filter(|(_, concrete)| self.catalog.is_subtype_of(concrete, &meta.name))
            .map(|(value, _)| RawValue::Text(value.clone()))
            .collect();
        filter.push_in(&discriminator.column, values);
    }

    fn select(&self, meta: &EntityMetadata, filter: &SqlFilter) -> String {
        let table = self.settings.table_name_for(&meta.table_name);
        format!("SELECT * FROM {} {}", quote_ident(&table), filter.where_clause())
    }

    async fn run(&self, sql: &str, params: &[RawValue]) -> Result<Vec<RawRow>, AuditError> {
        tracing::debug!(sql, params = params.len(), "querying audit table");
        self.source.execute(sql, params).await
    }

    fn assemble(&self, entity_type: &str, rows: Vec<RawRow>) -> Result<HistoryCollection, AuditError> {
        RevisionAssembler::new(
            &self.catalog,
            &self.resolver,
            self.settings.revision_column(),
            self.settings.revision_type_column(),
        )
        .assemble(entity_type, rows)
    }

    fn single(
        &self,
        entity_type: &str,
        identifier: &Identifier,
        revision: i64,
        rows: Vec<RawRow>,
    ) -> Result<HistoryRevision, AuditError> {
        self.assemble(entity_type, rows)?
            .into_revisions()
            .into_iter()
            .next()
            .ok_or_else(|| AuditError::NotFound {
                entity_type: entity_type.to_string(),
                identifier: identifier.to_string(),
                revision,
            })
    }
}
