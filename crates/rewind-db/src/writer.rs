//! Revision writer: appends entity snapshots to audit tables.

use rewind_core::entity::Entity;
use rewind_core::errors::CoreError;
use rewind_core::metadata::AssociationKind;
use rewind_core::revision::RevisionKind;
use rewind_core::storage::value_to_raw;
use rewind_core::value::{RawValue, Value};

use crate::RewindDb;
use crate::error::AuditError;
use crate::helpers::{quote_ident, to_sql_value};
use crate::ports::{AuditConfiguration, MetadataCatalog};

pub struct RevisionWriter<'a, C: MetadataCatalog, A: AuditConfiguration> {
    db: &'a RewindDb,
    catalog: &'a C,
    settings: &'a A,
}

impl<'a, C: MetadataCatalog, A: AuditConfiguration> RevisionWriter<'a, C, A> {
    pub const fn new(db: &'a RewindDb, catalog: &'a C, settings: &'a A) -> Self {
        Self {
            db,
            catalog,
            settings,
        }
    }

    /// Insert one audit row for `entity` at `revision`.
    ///
    /// Scalars are stored through their storage type, owning to-ones as
    /// their join columns; inverse sides and collections are not recorded.
    /// Members not set on the entity are written as `NULL`.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::NotLogged` if the type is not audited,
    /// `AuditError::Core` if the identifier has the wrong number of values
    /// or a value does not fit its storage type, and
    /// `AuditError::LibSql` if the insert fails.
    pub async fn append(&self, entity: &Entity, revision: i64, kind: RevisionKind) -> Result<(), AuditError> {
        let entity_type = entity.entity_type();
        let meta = self.catalog.require(entity_type)?;
        if !self.settings.is_logged(entity_type) {
            return Err(AuditError::NotLogged(entity_type.to_string()));
        }

        let identifier = entity.identifier();
        if identifier.len() != meta.identifier.len() {
            return Err(CoreError::IdentifierArity {
                entity_type: meta.name.clone(),
                expected: meta.identifier.len(),
                actual: identifier.len(),
            }
            .into());
        }

        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<RawValue> = Vec::new();

        for (field, value) in meta.identifier_fields().zip(identifier.values()) {
            columns.push(&field.column);
            values.push(field.storage_type.to_raw(value)?);
        }

        for field in meta.fields.iter().filter(|f| !meta.is_identifier(&f.name)) {
            let value = entity.scalar(&field.name).unwrap_or(&Value::Null);
            columns.push(&field.column);
            values.push(field.storage_type.to_raw(value)?);
        }

        for assoc in meta
            .associations
            .iter()
            .filter(|a| a.kind == AssociationKind::ToOneOwning)
        {
            let target = entity.related(&assoc.name).map(|r| r.identifier());
            for (idx, join) in assoc.join_columns.iter().enumerate() {
                let raw = target
                    .as_ref()
                    .and_then(|id| id.values().get(idx))
                    .map_or(RawValue::Null, value_to_raw);
                columns.push(&join.name);
                values.push(raw);
            }
        }

        if let (Some(root), Some(own_value)) = (
            self.catalog.discriminator_root(entity_type),
            meta.discriminator_value.as_deref(),
        ) {
            if let Some(discriminator) = &root.discriminator {
                if !columns.contains(&discriminator.column.as_str()) {
                    columns.push(&discriminator.column);
                    values.push(RawValue::Text(own_value.to_string()));
                }
            }
        }

        columns.push(self.settings.revision_column());
        values.push(RawValue::Integer(revision));
        columns.push(self.settings.revision_type_column());
        values.push(RawValue::Text(kind.as_str().to_string()));

        let table = self.settings.table_name_for(&meta.table_name);
        let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|n| format!("?{n}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&table),
            column_list.join(", "),
            placeholders.join(", ")
        );

        self.db
            .conn()
            .execute(&sql, libsql::params_from_iter(values.iter().map(to_sql_value)))
            .await?;

        tracing::debug!(
            entity_type,
            identifier = %entity.identifier(),
            revision,
            kind = kind.as_str(),
            table = table.as_str(),
            "appended audit row"
        );
        Ok(())
    }
}
