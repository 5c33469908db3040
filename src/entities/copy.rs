//! The Copy table (§3 "Copy") — a named replica of an (object-uuid, version).

use crate::error::{DssError, Result};
use crate::store::Handle;
use rusqlite::Row;

#[derive(Debug, Clone, PartialEq)]
pub struct CopyRecord {
    pub object_uuid: String,
    pub version: i64,
    pub copy_name: String,
    pub copy_status: String,
    pub creation_time: i64,
    pub access_time: i64,
    pub layout_info: Option<String>,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateFields: u8 {
        const STATUS      = 0b001;
        const ACCESS_TIME = 0b010;
        const LAYOUT_INFO = 0b100;
    }
}

pub fn insert(handle: &mut Handle, copy: &CopyRecord) -> Result<()> {
    handle.execute(
        "INSERT INTO copy (object_uuid, version, copy_name, copy_status, creation_time, access_time, layout_info)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        &[
            &copy.object_uuid,
            &copy.version,
            &copy.copy_name,
            &copy.copy_status,
            &copy.creation_time,
            &copy.access_time,
            &copy.layout_info,
        ],
    )?;
    Ok(())
}

pub fn update(handle: &mut Handle, key: (&str, i64, &str), new: &CopyRecord, fields: UpdateFields) -> Result<()> {
    if fields.is_empty() {
        return Err(DssError::invalid_data("update field mask must be non-empty"));
    }
    let mut sets = Vec::new();
    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
    if fields.contains(UpdateFields::STATUS) {
        sets.push("copy_status = ?");
        params.push(&new.copy_status);
    }
    if fields.contains(UpdateFields::ACCESS_TIME) {
        sets.push("access_time = ?");
        params.push(&new.access_time);
    }
    if fields.contains(UpdateFields::LAYOUT_INFO) {
        sets.push("layout_info = ?");
        params.push(&new.layout_info);
    }
    let (uuid, version, name) = key;
    params.push(&uuid);
    params.push(&version);
    params.push(&name);
    let stmt = format!(
        "UPDATE copy SET {} WHERE object_uuid = ? AND version = ? AND copy_name = ?",
        sets.join(", ")
    );
    let affected = handle.execute(&stmt, &params)?;
    if affected == 0 {
        return Err(DssError::not_found("no copy matches the given key"));
    }
    Ok(())
}

pub fn delete(handle: &mut Handle, object_uuid: &str, version: i64, copy_name: &str) -> Result<()> {
    let affected = handle.execute(
        "DELETE FROM copy WHERE object_uuid = ?1 AND version = ?2 AND copy_name = ?3",
        &[&object_uuid, &version, &copy_name],
    )?;
    if affected == 0 {
        return Err(DssError::not_found("no copy matches the given key"));
    }
    Ok(())
}

pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<CopyRecord>> {
    if second.is_some() {
        return Err(DssError::not_supported("copy select accepts only one predicate fragment"));
    }
    let mut stmt =
        "SELECT object_uuid, version, copy_name, copy_status, creation_time, access_time, layout_info FROM copy"
            .to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    handle.query(&stmt, &[], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<CopyRecord> {
    Ok(CopyRecord {
        object_uuid: row.get(0)?,
        version: row.get(1)?,
        copy_name: row.get(2)?,
        copy_status: row.get(3)?,
        creation_time: row.get(4)?,
        access_time: row.get(5)?,
        layout_info: row.get(6)?,
    })
}
