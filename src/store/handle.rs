//! The Store gateway (`Handle`): connection lifecycle, statement execution,
//! the transaction envelope, and identifier/literal escaping.
//!
//! Modeled on the teacher's `core/db.rs` (`db_connect` enabling WAL,
//! foreign keys, and a busy timeout unconditionally at connect time) and
//! `core/broker.rs` (the closure-based `with_conn` transaction wrapper).
//! Unlike the teacher's broker, a `Handle` is not shared across threads —
//! the specification's concurrency model is one blocking connection per
//! Handle, serialized by the caller — so every method that touches the
//! connection takes `&mut self`, which makes concurrent misuse a compile
//! error rather than a runtime race.

use crate::error::{DssError, ErrorKind, Result};
use crate::store::schema;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;

/// Busy-timeout applied to every connection (cross-process lock contention).
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Sink for backend notices, relayed the way the specification's notice
/// handler relays backend notices to the process log (trailing newline
/// stripped). Defaults to stderr.
pub type NoticeSink = Arc<dyn Fn(&str) + Send + Sync>;

fn default_notice_sink() -> NoticeSink {
    Arc::new(|msg: &str| eprintln!("[dss notice] {msg}"))
}

/// A Store gateway connection. Not `Send`/`Sync`: exactly one blocking
/// connection, used by exactly one caller at a time (§5).
pub struct Handle {
    conn: Connection,
    notice_sink: NoticeSink,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("conn", &self.conn).finish_non_exhaustive()
    }
}

impl Handle {
    /// Open a connection and run the schema gate (§4.H). Fails with
    /// `NotConnected` if the backend cannot be reached, `SchemaMismatch`
    /// if the persisted schema version doesn't match [`schema::SCHEMA_VERSION`].
    pub fn open(connect_string: &str) -> Result<Self> {
        Self::open_with_notice_sink(connect_string, default_notice_sink())
    }

    pub fn open_with_notice_sink(connect_string: &str, notice_sink: NoticeSink) -> Result<Self> {
        let db_path = parse_db_path(connect_string);
        let conn = Connection::open(&db_path).map_err(|e| {
            DssError::with_source(
                ErrorKind::NotConnected,
                format!("cannot open backend at '{db_path}': {e}"),
                e,
            )
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(BUSY_TIMEOUT_SECS))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute("PRAGMA foreign_keys=ON;", [])?;

        let handle = Handle { conn, notice_sink };
        handle.run_schema_gate()?;
        Ok(handle)
    }

    /// Create every entity table if absent and seed `schema_info` with the
    /// current version. A test/first-run convenience (see `SPEC_FULL.md`);
    /// production deployments own schema creation externally.
    pub fn bootstrap_schema(connect_string: &str) -> Result<()> {
        let db_path = parse_db_path(connect_string);
        let conn = Connection::open(&db_path)?;
        for stmt in schema::ALL {
            conn.execute(stmt, [])?;
        }
        conn.execute(
            "INSERT OR IGNORE INTO schema_info(version) VALUES (?1)",
            [schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    fn run_schema_gate(&self) -> Result<()> {
        let count: std::result::Result<i64, rusqlite::Error> = self.conn.query_row(
            "SELECT COUNT(*) FROM schema_info WHERE version = ?1",
            [schema::SCHEMA_VERSION],
            |row| row.get(0),
        );
        match count {
            Ok(1) => Ok(()),
            Ok(_) => Err(DssError::schema_mismatch(format!(
                "expected exactly one schema_info row for version {}",
                schema::SCHEMA_VERSION
            ))),
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                if msg.contains("no such table") =>
            {
                Err(DssError::schema_mismatch(
                    "schema_info table is absent; backend has not been bootstrapped",
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent close. `Handle`'s `Drop` already releases the connection;
    /// this exists so callers have an explicit symmetric counterpart to
    /// `open`, matching the specification's `close(Handle)` entry point.
    pub fn close(self) {}

    /// Relay a raw backend notice, stripping a trailing newline.
    pub fn notify(&self, raw: &str) {
        (self.notice_sink)(raw.trim_end_matches('\n'));
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Submit a single DML/DDL statement with positional parameters.
    pub fn execute(&mut self, stmt: &str, params: &[&dyn rusqlite::ToSql]) -> Result<usize> {
        Ok(self.conn.execute(stmt, params)?)
    }

    /// Submit a SELECT, decoding each row with `map_row`.
    pub fn query<T>(
        &self,
        stmt: &str,
        params: &[&dyn rusqlite::ToSql],
        mut map_row: impl FnMut(&rusqlite::Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut prepared = self.conn.prepare(stmt)?;
        let rows = prepared.query_map(params, |row| map_row(row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Run `f` inside `BEGIN; ... COMMIT;`, rolling back on any failure.
    /// The original failure is preserved; a rollback failure is relayed as
    /// a notice only (§4.A).
    pub fn execute_in_transaction<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<R>,
    {
        let tx = self.conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(original_err) => {
                if let Err(rollback_err) = tx.rollback() {
                    self.notify(&format!("rollback failed: {rollback_err}"));
                }
                Err(original_err)
            }
        }
    }
}

/// Backend-aware literal escaping. `NULL` and the empty string both
/// collapse to the unquoted token `NULL` (§4.A).
pub fn escape_literal(s: Option<&str>) -> String {
    match s {
        None => "NULL".to_string(),
        Some("") => "NULL".to_string(),
        Some(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Backend-aware identifier escaping (double-quoted, internal quotes doubled).
pub fn escape_identifier(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Parse a libpq-style `key=value key2=value2` connection string and
/// extract the `dbname` component. Other keys (`host`, ...) are accepted
/// but have no meaning for the SQLite-backed Store; a connect string with
/// no `dbname` key falls back to `dss.db`, matching the teacher's pattern
/// of a sane on-disk default over an in-memory one.
fn parse_db_path(connect_string: &str) -> String {
    let mut kv: HashMap<&str, &str> = HashMap::new();
    for token in connect_string.split_whitespace() {
        if let Some((k, v)) = token.split_once('=') {
            kv.insert(k, v);
        }
    }
    kv.get("dbname").map(|s| s.to_string()).unwrap_or_else(|| "dss.db".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_literal_null_and_empty_collapse() {
        assert_eq!(escape_literal(None), "NULL");
        assert_eq!(escape_literal(Some("")), "NULL");
    }

    #[test]
    fn escape_literal_doubles_single_quotes() {
        assert_eq!(escape_literal(Some("o'brien")), "'o''brien'");
    }

    #[test]
    fn escape_identifier_doubles_double_quotes() {
        assert_eq!(escape_identifier("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn parse_db_path_extracts_dbname() {
        assert_eq!(parse_db_path("dbname=phobos host=localhost"), "phobos");
        assert_eq!(parse_db_path("host=localhost"), "dss.db");
    }

    #[test]
    fn open_bootstrap_and_schema_gate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let connect = format!("dbname={}", path.display());
        Handle::bootstrap_schema(&connect).unwrap();
        let handle = Handle::open(&connect).unwrap();
        handle.close();
    }

    #[test]
    fn open_without_bootstrap_fails_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t2.db");
        let connect = format!("dbname={}", path.display());
        let err = Handle::open(&connect).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaMismatch);
    }
}
