//! Criteria Translator: field-name criteria → parameterized WHERE clauses.
//!
//! Translation only authorizes which members are queryable and builds the
//! predicate; the [`crate::source::RowSource`] executes it. Predicates are
//! equality only.

use rewind_core::metadata::{AssociationKind, EntityMetadata};
use rewind_core::storage::value_to_raw;
use rewind_core::value::{RawValue, Value};

use crate::error::AuditError;
use crate::helpers::quote_ident;
use crate::ports::MetadataCatalog;

/// Equality criteria, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria(Vec<(String, Value)>);

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `field = value`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((field.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(f, v)| (f.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Conjunction of predicates and their positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFilter {
    clauses: Vec<String>,
    params: Vec<RawValue>,
}

impl SqlFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `column = ?n`.
    pub fn push_eq(&mut self, column: &str, value: RawValue) {
        self.params.push(value);
        self.clauses
            .push(format!("{} = ?{}", quote_ident(column), self.params.len()));
    }

    /// Append `column <= ?n`.
    pub fn push_at_most(&mut self, column: &str, value: RawValue) {
        self.params.push(value);
        self.clauses
            .push(format!("{} <= ?{}", quote_ident(column), self.params.len()));
    }

    /// Append `column IN (?n, ...)`. An empty set matches nothing.
    pub fn push_in(&mut self, column: &str, values: Vec<RawValue>) {
        if values.is_empty() {
            self.clauses.push("0 = 1".to_string());
            return;
        }
        let mut placeholders = Vec::with_capacity(values.len());
        for value in values {
            self.params.push(value);
            placeholders.push(format!("?{}", self.params.len()));
        }
        self.clauses.push(format!(
            "{} IN ({})",
            quote_ident(column),
            placeholders.join(", ")
        ));
    }

    /// Append a clause with no parameters.
    pub fn push_raw(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    #[must_use]
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    #[must_use]
    pub fn params(&self) -> &[RawValue] {
        &self.params
    }

    #[must_use]
    pub fn into_params(self) -> Vec<RawValue> {
        self.params
    }

    /// `WHERE a AND b ...`, or an empty string when there are no clauses.
    #[must_use]
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Resolves criteria against the metadata catalog.
pub struct CriteriaTranslator<'a, C: MetadataCatalog> {
    catalog: &'a C,
}

impl<'a, C: MetadataCatalog> CriteriaTranslator<'a, C> {
    pub const fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Translate criteria for `entity_type` into a filter, clauses in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::IncorrectCriteria` if a key is neither a scalar
    /// field nor a single-column owning association, `AuditError::Core` if a
    /// value does not fit the field's storage type, and
    /// `AuditError::UnknownEntityType` for an uncatalogued type.
    pub fn translate(&self, entity_type: &str, criteria: &Criteria) -> Result<SqlFilter, AuditError> {
        let meta = self.catalog.require(entity_type)?;
        let mut filter = SqlFilter::new();
        self.translate_into(meta, criteria, &mut filter)?;
        Ok(filter)
    }

    /// Append translated criteria to an existing filter.
    ///
    /// # Errors
    ///
    /// Same as [`CriteriaTranslator::translate`].
    pub fn translate_into(
        &self,
        meta: &EntityMetadata,
        criteria: &Criteria,
        filter: &mut SqlFilter,
    ) -> Result<(), AuditError> {
        for (field, value) in criteria.iter() {
            if let Some(mapping) = meta.field(field) {
                filter.push_eq(&mapping.column, mapping.storage_type.to_raw(value)?);
                continue;
            }

            match meta.association(field) {
                Some(assoc)
                    if assoc.kind == AssociationKind::ToOneOwning
                        && assoc.join_columns.len() == 1 =>
                {
                    let join = &assoc.join_columns[0];
                    let raw = self
                        .catalog
                        .metadata_for(&assoc.target_type)
                        .and_then(|target| {
                            target
                                .fields
                                .iter()
                                .find(|f| f.column == join.referenced_column)
                        })
                        .map_or_else(|| Ok(value_to_raw(value)), |f| f.storage_type.to_raw(value))?;
                    filter.push_eq(&join.name, raw);
                }
                _ => {
                    return Err(AuditError::IncorrectCriteria {
                        field: field.to_string(),
                        entity_type: meta.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// `ORDER BY` fragment: identifier columns descending, then `revision_column`
/// descending.
#[must_use]
pub fn order_by_identifier_desc(meta: &EntityMetadata, revision_column: &str) -> String {
    let mut parts: Vec<String> = meta
        .identifier_columns()
        .into_iter()
        .map(|c| format!("{} DESC", quote_ident(c)))
        .collect();
    parts.push(format!("{} DESC", quote_ident(revision_column)));
    format!("ORDER BY {}", parts.join(", "))
}
