//! The Device table (§3 "Device") — a drive or mount point that can host media.

use crate::error::{DssError, Result};
use crate::store::Handle;
use rusqlite::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    Unlocked,
    Locked,
    Failed,
}

impl AdminStatus {
    fn as_str(self) -> &'static str {
        match self {
            AdminStatus::Unlocked => "unlocked",
            AdminStatus::Locked => "locked",
            AdminStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> rusqlite::Result<Self> {
        match s {
            "unlocked" => Ok(AdminStatus::Unlocked),
            "locked" => Ok(AdminStatus::Locked),
            "failed" => Ok(AdminStatus::Failed),
            other => Err(rusqlite::Error::InvalidColumnType(
                6,
                format!("unrecognized admin status '{other}'"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub family: String,
    pub name: String,
    pub library: String,
    pub model: Option<String>,
    pub host: String,
    pub path: String,
    pub admin_status: AdminStatus,
}

pub fn insert(handle: &mut Handle, device: &Device) -> Result<()> {
    handle.execute(
        "INSERT INTO device (family, name, library, model, host, path, admin_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        &[
            &device.family,
            &device.name,
            &device.library,
            &device.model,
            &device.host,
            &device.path,
            &device.admin_status.as_str(),
        ],
    )?;
    Ok(())
}

pub fn update_admin_status(
    handle: &mut Handle,
    key: (&str, &str, &str),
    status: AdminStatus,
) -> Result<()> {
    let (family, name, library) = key;
    let affected = handle.execute(
        "UPDATE device SET admin_status = ?1 WHERE family = ?2 AND name = ?3 AND library = ?4",
        &[&status.as_str(), &family, &name, &library],
    )?;
    if affected == 0 {
        return Err(DssError::not_found("no device matches the given key"));
    }
    Ok(())
}

pub fn delete(handle: &mut Handle, family: &str, name: &str, library: &str) -> Result<()> {
    let affected = handle.execute(
        "DELETE FROM device WHERE family = ?1 AND name = ?2 AND library = ?3",
        &[&family, &name, &library],
    )?;
    if affected == 0 {
        return Err(DssError::not_found("no device matches the given key"));
    }
    Ok(())
}

pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<Device>> {
    if second.is_some() {
        return Err(DssError::not_supported("device select accepts only one predicate fragment"));
    }
    let mut stmt = "SELECT family, name, library, model, host, path, admin_status FROM device".to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    handle.query(&stmt, &[], from_row)
}

/// Devices unlocked on `host` for `family` — the "usable" set (§3).
pub fn usable(handle: &Handle, family: &str, host: &str) -> Result<Vec<Device>> {
    handle.query(
        "SELECT family, name, library, model, host, path, admin_status
         FROM device WHERE family = ?1 AND host = ?2 AND admin_status = 'unlocked'",
        &[&family, &host],
        from_row,
    )
}

pub fn from_row(row: &Row) -> rusqlite::Result<Device> {
    let status_raw: String = row.get(6)?;
    Ok(Device {
        family: row.get(0)?,
        name: row.get(1)?,
        library: row.get(2)?,
        model: row.get(3)?,
        host: row.get(4)?,
        path: row.get(5)?,
        admin_status: AdminStatus::parse(&status_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Handle;

    fn opened() -> (tempfile::TempDir, Handle) {
        let dir = tempfile::tempdir().unwrap();
        let connect = format!("dbname={}", dir.path().join("t.db").display());
        Handle::bootstrap_schema(&connect).unwrap();
        (dir, Handle::open(&connect).unwrap())
    }

    fn sample(name: &str, status: AdminStatus) -> Device {
        Device {
            family: "tape".to_string(),
            name: name.to_string(),
            library: "lib0".to_string(),
            model: Some("ULTRIUM".to_string()),
            host: "host1".to_string(),
            path: "/dev/st0".to_string(),
            admin_status: status,
        }
    }

    #[test]
    fn usable_filters_by_host_and_status() {
        let (_dir, mut handle) = opened();
        insert(&mut handle, &sample("d1", AdminStatus::Unlocked)).unwrap();
        insert(&mut handle, &sample("d2", AdminStatus::Locked)).unwrap();
        let usable = usable(&handle, "tape", "host1").unwrap();
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].name, "d1");
    }
}
