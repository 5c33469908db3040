//! The alive Object table (§3 "Object (alive)").

use crate::error::{DssError, Result};
use crate::store::Handle;
use rusqlite::Row;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub oid: String,
    pub uuid: String,
    pub version: i64,
    pub user_md: Value,
    pub grouping: Option<String>,
    pub size: i64,
    pub creation_time: i64,
}

bitflags::bitflags! {
    /// Field selection for [`update`]. `oid` is deliberately absent: an
    /// oid change only ever happens through the dedicated rename path in
    /// `crud::rename_object`, under lock, never through a plain field mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateFields: u8 {
        const USER_MD  = 0b001;
        const GROUPING = 0b010;
        const SIZE     = 0b100;
    }
}

pub fn insert(handle: &mut Handle, obj: &Object) -> Result<()> {
    handle.execute(
        "INSERT INTO object (oid, uuid, version, user_md, grouping_label, size, creation_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        &[
            &obj.oid,
            &obj.uuid,
            &obj.version,
            &obj.user_md.to_string(),
            &obj.grouping,
            &obj.size,
            &obj.creation_time,
        ],
    )?;
    Ok(())
}

/// Apply `fields` from `new` onto the row keyed by `oid`. Updating with an
/// empty mask fails `InvalidData` (§4.C).
pub fn update(handle: &mut Handle, oid: &str, new: &Object, fields: UpdateFields) -> Result<()> {
    if fields.is_empty() {
        return Err(DssError::invalid_data("update field mask must be non-empty"));
    }
    let user_md_str = new.user_md.to_string();
    let mut sets = Vec::new();
    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
    if fields.contains(UpdateFields::USER_MD) {
        sets.push("user_md = ?");
        params.push(&user_md_str);
    }
    if fields.contains(UpdateFields::GROUPING) {
        sets.push("grouping_label = ?");
        params.push(&new.grouping);
    }
    if fields.contains(UpdateFields::SIZE) {
        sets.push("size = ?");
        params.push(&new.size);
    }
    params.push(&oid);
    let stmt = format!("UPDATE object SET {} WHERE oid = ?", sets.join(", "));
    let affected = handle.execute(&stmt, &params)?;
    if affected == 0 {
        return Err(DssError::not_found(format!("no object with oid {oid}")));
    }
    Ok(())
}

pub fn delete(handle: &mut Handle, oid: &str) -> Result<()> {
    let affected = handle.execute("DELETE FROM object WHERE oid = ?1", &[&oid])?;
    if affected == 0 {
        return Err(DssError::not_found(format!("no object with oid {oid}")));
    }
    Ok(())
}

/// At most one predicate fragment is supported: Object is single-table.
pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<Object>> {
    if second.is_some() {
        return Err(DssError::not_supported(
            "object select accepts only one predicate fragment",
        ));
    }
    let mut stmt = "SELECT oid, uuid, version, user_md, grouping_label, size, creation_time FROM object".to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    handle.query(&stmt, &[], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<Object> {
    let user_md_raw: String = row.get(3)?;
    Ok(Object {
        oid: row.get(0)?,
        uuid: row.get(1)?,
        version: row.get(2)?,
        user_md: serde_json::from_str(&user_md_raw).unwrap_or(Value::Null),
        grouping: row.get(4)?,
        size: row.get(5)?,
        creation_time: row.get(6)?,
    })
}
