//! # rewind-db
//!
//! Revision hydration and restore engine over libSQL audit tables.
//!
//! Reads historical snapshot rows for tracked entity types, hydrates them
//! into typed object graphs, and reverts live objects to a chosen revision
//! by computing a field-level changeset.
//!
//! The only asynchronous boundary is the [`source::RowSource`]; hydration,
//! assembly and restore are plain synchronous code.

pub mod assembler;
pub mod catalog;
pub mod criteria;
pub mod error;
pub mod helpers;
pub mod hydrator;
pub mod ports;
pub mod reader;
pub mod resolver;
pub mod restore;
pub mod settings;
pub mod source;
pub mod tracker;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use error::{AuditError, HydrationDefect};
pub use reader::AuditReader;

use libsql::Builder;
use rewind_config::DatabaseConfig;

/// Database handle for audit table reads and writes.
pub struct RewindDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl RewindDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::LibSql` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, AuditError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        tracing::debug!(path, "opened audit database");
        Ok(Self { db, conn })
    }

    /// Open the database named by the configuration, creating its parent
    /// directory when needed.
    ///
    /// # Errors
    ///
    /// Returns `AuditError` if the directory cannot be created or the
    /// database cannot be opened.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AuditError> {
        if !config.is_in_memory() {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
                }
            }
        }
        Self::open_local(&config.path).await
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory() {
        let db = RewindDb::open_local(":memory:").await.unwrap();
        let mut rows = db.conn().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.db");
        let config = DatabaseConfig {
            path: path.to_string_lossy().into_owned(),
        };

        let db = RewindDb::open(&config).await.unwrap();
        db.conn()
            .execute("CREATE TABLE t (id INTEGER)", ())
            .await
            .unwrap();
        assert!(path.exists());
    }
}
