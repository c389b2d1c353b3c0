use super::schema::{self, SCHEMA_VERSION};
use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use tickprof_trace::{History, PersistenceSink};

/// A stored key with its size and last write time.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub key: String,
    pub bytes: i64,
    pub updated_at: String,
}

/// SQLite-backed key/value store for serialized profiling history.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open (or create) a store file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode so viewers can read while the host writes
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::from_connection(conn)
    }

    /// Private in-memory store
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::create_tables(&conn)?;

        match schema::get_meta(&conn, "schema_version")? {
            Some(version) if version != SCHEMA_VERSION.to_string() => {
                return Err(Error::InvalidArgument(format!(
                    "store schema version {} is not supported (expected {})",
                    version, SCHEMA_VERSION
                )));
            }
            Some(_) => {}
            None => {
                schema::set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
                schema::set_meta(&conn, "created_at", &chrono::Utc::now().to_rfc3339())?;
            }
        }

        Ok(SqliteSink { conn })
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        schema::put_value(&self.conn, key, value, &chrono::Utc::now().to_rfc3339())?;
        Ok(())
    }

    pub fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(schema::get_value(&self.conn, key)?.map(|(value, _)| value))
    }

    /// Read and parse the history blob stored under `key`.
    pub fn load_history(&self, key: &str) -> Result<History> {
        let json = self.read(key)?.ok_or_else(|| Error::HistoryNotFound {
            key: key.to_string(),
        })?;
        Ok(History::from_json(&json)?)
    }

    pub fn entries(&self) -> Result<Vec<StoredEntry>> {
        Ok(schema::list_values(&self.conn)?
            .into_iter()
            .map(|(key, bytes, updated_at)| StoredEntry {
                key,
                bytes,
                updated_at,
            })
            .collect())
    }

    pub fn created_at(&self) -> Result<Option<String>> {
        Ok(schema::get_meta(&self.conn, "created_at")?)
    }
}

impl PersistenceSink for SqliteSink {
    fn write(&mut self, key: &str, value: &str) -> tickprof_trace::Result<()> {
        self.put(key, value).map_err(tickprof_trace::Error::sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut sink = SqliteSink::in_memory().unwrap();
        sink.write("profiler", "first").unwrap();
        sink.write("profiler", "second").unwrap();
        assert_eq!(sink.read("profiler").unwrap().as_deref(), Some("second"));
        assert_eq!(sink.read("missing").unwrap(), None);

        let entries = sink.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bytes, 6);
    }

    #[test]
    fn missing_history_is_reported() {
        let sink = SqliteSink::in_memory().unwrap();
        let err = sink.load_history("profiler").unwrap_err();
        assert!(matches!(err, Error::HistoryNotFound { .. }));
    }

    #[test]
    fn records_schema_version() {
        let sink = SqliteSink::in_memory().unwrap();
        assert!(sink.created_at().unwrap().is_some());
    }
}
