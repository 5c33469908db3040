//! The Log table (§3 "Log record") — an append-only operational event
//! stream. Read by the health engine (`crate::health`) and written through
//! `crate::health::emit_log`, never inserted directly by callers.

use crate::error::Result;
use crate::store::Handle;
use crate::time;
use rusqlite::Row;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Device,
    Medium,
}

impl ResourceKind {
    fn column_prefix(self) -> &'static str {
        match self {
            ResourceKind::Device => "device",
            ResourceKind::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub id: String,
    pub device: Option<(String, String, String)>,
    pub medium: Option<(String, String, String)>,
    pub errno: i64,
    pub cause: String,
    pub message: Value,
    pub ts: i64,
}

impl LogRecord {
    pub fn new(cause: impl Into<String>, errno: i64, message: Value) -> Self {
        Self {
            id: time::new_id(),
            device: None,
            medium: None,
            errno,
            cause: cause.into(),
            message,
            ts: time::now_epoch(),
        }
    }

    pub fn with_device(mut self, family: &str, name: &str, library: &str) -> Self {
        self.device = Some((family.to_string(), name.to_string(), library.to_string()));
        self
    }

    pub fn with_medium(mut self, family: &str, name: &str, library: &str) -> Self {
        self.medium = Some((family.to_string(), name.to_string(), library.to_string()));
        self
    }
}

pub fn insert(handle: &mut Handle, log: &LogRecord) -> Result<()> {
    let message_str = log.message.to_string();
    let (dev_f, dev_n, dev_l) = log
        .device
        .clone()
        .map(|(f, n, l)| (Some(f), Some(n), Some(l)))
        .unwrap_or((None, None, None));
    let (med_f, med_n, med_l) = log
        .medium
        .clone()
        .map(|(f, n, l)| (Some(f), Some(n), Some(l)))
        .unwrap_or((None, None, None));
    handle.execute(
        "INSERT INTO log (id, device_family, device_name, device_library, medium_family, medium_name, medium_library, errno, cause, message, ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        &[
            &log.id,
            &dev_f,
            &dev_n,
            &dev_l,
            &med_f,
            &med_n,
            &med_l,
            &log.errno,
            &log.cause,
            &message_str,
            &log.ts,
        ],
    )?;
    Ok(())
}

/// Chronological log rows for one resource, oldest first — the sequence
/// the health engine scans (§4.F).
pub fn for_resource(handle: &Handle, kind: ResourceKind, family: &str, name: &str, library: &str) -> Result<Vec<LogRecord>> {
    let prefix = kind.column_prefix();
    let stmt = format!(
        "SELECT id, device_family, device_name, device_library, medium_family, medium_name, medium_library, errno, cause, message, ts
         FROM log WHERE {prefix}_family = ?1 AND {prefix}_name = ?2 AND {prefix}_library = ?3
         ORDER BY ts ASC"
    );
    handle.query(&stmt, &[&family, &name, &library], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<LogRecord> {
    let message_raw: String = row.get(9)?;
    let device = match (row.get::<_, Option<String>>(1)?, row.get::<_, Option<String>>(2)?, row.get::<_, Option<String>>(3)?) {
        (Some(f), Some(n), Some(l)) => Some((f, n, l)),
        _ => None,
    };
    let medium = match (row.get::<_, Option<String>>(4)?, row.get::<_, Option<String>>(5)?, row.get::<_, Option<String>>(6)?) {
        (Some(f), Some(n), Some(l)) => Some((f, n, l)),
        _ => None,
    };
    Ok(LogRecord {
        id: row.get(0)?,
        device,
        medium,
        errno: row.get(7)?,
        cause: row.get(8)?,
        message: serde_json::from_str(&message_raw).unwrap_or(Value::Null),
        ts: row.get(10)?,
    })
}
