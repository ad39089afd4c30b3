//! libSQL value conversion and SQL text helpers.

use rewind_core::value::RawValue;

use crate::error::AuditError;

/// Convert a storage scalar into a libSQL parameter.
#[must_use]
pub fn to_sql_value(raw: &RawValue) -> libsql::Value {
    match raw {
        RawValue::Null => libsql::Value::Null,
        RawValue::Integer(n) => libsql::Value::Integer(*n),
        RawValue::Real(x) => libsql::Value::Real(*x),
        RawValue::Text(s) => libsql::Value::Text(s.clone()),
        RawValue::Blob(b) => libsql::Value::Blob(b.clone()),
    }
}

/// Convert a libSQL column value into a storage scalar.
#[must_use]
pub fn from_sql_value(value: libsql::Value) -> RawValue {
    match value {
        libsql::Value::Null => RawValue::Null,
        libsql::Value::Integer(n) => RawValue::Integer(n),
        libsql::Value::Real(x) => RawValue::Real(x),
        libsql::Value::Text(s) => RawValue::Text(s),
        libsql::Value::Blob(b) => RawValue::Blob(b),
    }
}

/// Quote a table or column name for interpolation into SQL.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read a revision number out of its raw column value.
///
/// # Errors
///
/// Returns `AuditError::InvalidRevision` unless the value is an integer or
/// integer text.
pub fn parse_revision(raw: &RawValue, column: &str) -> Result<i64, AuditError> {
    let invalid = || AuditError::InvalidRevision {
        column: column.to_string(),
        raw: raw.to_string(),
    };
    match raw {
        RawValue::Integer(n) => Ok(*n),
        RawValue::Text(s) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("posts_audit"), "\"posts_audit\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn sql_value_roundtrip() {
        let raw = RawValue::Text("hello".into());
        assert_eq!(from_sql_value(to_sql_value(&raw)), raw);
        assert_eq!(from_sql_value(libsql::Value::Null), RawValue::Null);
    }

    #[test]
    fn revision_parsing() {
        assert_eq!(parse_revision(&RawValue::Integer(4), "rev").unwrap(), 4);
        assert_eq!(parse_revision(&RawValue::Text("12".into()), "rev").unwrap(), 12);
        assert!(matches!(
            parse_revision(&RawValue::Null, "rev"),
            Err(AuditError::InvalidRevision { .. })
        ));
    }
}
