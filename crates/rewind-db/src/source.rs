//! Row Source: raw audit rows and the query executor that produces them.

use std::collections::HashMap;

use rewind_core::value::RawValue;

use crate::RewindDb;
use crate::error::AuditError;
use crate::helpers::{from_sql_value, to_sql_value};

static NULL: RawValue = RawValue::Null;

/// One audit row: column name → raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    columns: HashMap<String, RawValue>,
}

impl RawRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.columns.get(column)
    }

    /// Column value, `NULL` if the column is absent.
    #[must_use]
    pub fn get_or_null(&self, column: &str) -> &RawValue {
        self.columns.get(column).unwrap_or(&NULL)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Builder-style [`RawRow::insert`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Remove a column, returning its value.
    pub fn take(&mut self, column: &str) -> Option<RawValue> {
        self.columns.remove(column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, RawValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Executes parameterized SQL against audit tables.
///
/// This is the engine's only I/O boundary. Everything downstream of the
/// returned rows (assembly, hydration, restore) is synchronous.
#[allow(async_fn_in_trait)]
pub trait RowSource {
    /// Run `sql` with positional `params` and return every row.
    async fn execute(&self, sql: &str, params: &[RawValue]) -> Result<Vec<RawRow>, AuditError>;
}

impl RowSource for RewindDb {
    async fn execute(&self, sql: &str, params: &[RawValue]) -> Result<Vec<RawRow>, AuditError> {
        let mut rows = self
            .conn()
            .query(sql, libsql::params_from_iter(params.iter().map(to_sql_value)))
            .await?;

        let names: Vec<String> = (0..rows.column_count())
            .map(|idx| rows.column_name(idx).unwrap_or_default().to_string())
            .collect();

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let mut raw = RawRow::new();
            for (idx, name) in (0_i32..).zip(&names) {
                raw.insert(name.clone(), from_sql_value(row.get_value(idx)?));
            }
            out.push(raw);
        }

        tracing::debug!(rows = out.len(), "audit query returned");
        Ok(out)
    }
}
