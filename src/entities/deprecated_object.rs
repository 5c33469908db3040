//! The deprecated Object table (§3 "Deprecated object").
//!
//! Primary key is `(uuid, version)`, not `oid`: an oid can recur across
//! generations once its earlier holder is deprecated or re-alived.

use crate::error::{DssError, Result};
use crate::store::Handle;
use rusqlite::Row;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DeprecatedObject {
    pub uuid: String,
    pub version: i64,
    pub oid: String,
    pub user_md: Value,
    pub grouping: Option<String>,
    pub size: i64,
    pub creation_time: i64,
    pub deprec_time: i64,
}

pub fn insert(handle: &mut Handle, obj: &DeprecatedObject) -> Result<()> {
    handle.execute(
        "INSERT INTO deprecated_object
            (uuid, version, oid, user_md, grouping_label, size, creation_time, deprec_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        &[
            &obj.uuid,
            &obj.version,
            &obj.oid,
            &obj.user_md.to_string(),
            &obj.grouping,
            &obj.size,
            &obj.creation_time,
            &obj.deprec_time,
        ],
    )?;
    Ok(())
}

/// The only supported update: change `oid` (§4.C — "used by object rename").
/// All other fields are immutable once an object is deprecated.
pub fn update_oid(handle: &mut Handle, uuid: &str, version: i64, new_oid: &str) -> Result<()> {
    let affected = handle.execute(
        "UPDATE deprecated_object SET oid = ?1 WHERE uuid = ?2 AND version = ?3",
        &[&new_oid, &uuid, &version],
    )?;
    if affected == 0 {
        return Err(DssError::not_found(format!(
            "no deprecated object ({uuid}, {version})"
        )));
    }
    Ok(())
}

pub fn delete(handle: &mut Handle, uuid: &str, version: i64) -> Result<()> {
    let affected = handle.execute(
        "DELETE FROM deprecated_object WHERE uuid = ?1 AND version = ?2",
        &[&uuid, &version],
    )?;
    if affected == 0 {
        return Err(DssError::not_found(format!(
            "no deprecated object ({uuid}, {version})"
        )));
    }
    Ok(())
}

pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<DeprecatedObject>> {
    if second.is_some() {
        return Err(DssError::not_supported(
            "deprecated_object select accepts only one predicate fragment",
        ));
    }
    let mut stmt =
        "SELECT uuid, version, oid, user_md, grouping_label, size, creation_time, deprec_time FROM deprecated_object"
            .to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    handle.query(&stmt, &[], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<DeprecatedObject> {
    let user_md_raw: String = row.get(3)?;
    Ok(DeprecatedObject {
        uuid: row.get(0)?,
        version: row.get(1)?,
        oid: row.get(2)?,
        user_md: serde_json::from_str(&user_md_raw).unwrap_or(Value::Null),
        grouping: row.get(4)?,
        size: row.get(5)?,
        creation_time: row.get(6)?,
        deprec_time: row.get(7)?,
    })
}

/// Move an alive [`super::object::Object`] into this table, preserving every
/// field but stamping `deprec_time`. Caller owns the transaction boundary
/// (see `crud::deprecate_object`).
pub fn from_alive(obj: &super::object::Object, deprec_time: i64) -> DeprecatedObject {
    DeprecatedObject {
        uuid: obj.uuid.clone(),
        version: obj.version,
        oid: obj.oid.clone(),
        user_md: obj.user_md.clone(),
        grouping: obj.grouping.clone(),
        size: obj.size,
        creation_time: obj.creation_time,
        deprec_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Handle;
    use serde_json::json;

    fn opened() -> (tempfile::TempDir, Handle) {
        let dir = tempfile::tempdir().unwrap();
        let connect = format!("dbname={}", dir.path().join("t.db").display());
        Handle::bootstrap_schema(&connect).unwrap();
        (dir, Handle::open(&connect).unwrap())
    }

    fn sample() -> DeprecatedObject {
        DeprecatedObject {
            uuid: "u1".to_string(),
            version: 1,
            oid: "a".to_string(),
            user_md: json!({}),
            grouping: None,
            size: 10,
            creation_time: 1,
            deprec_time: 2,
        }
    }

    #[test]
    fn update_oid_changes_only_oid() {
        let (_dir, mut handle) = opened();
        insert(&mut handle, &sample()).unwrap();
        update_oid(&mut handle, "u1", 1, "b").unwrap();
        let rows = select(&handle, Some("uuid = 'u1'"), None).unwrap();
        assert_eq!(rows[0].oid, "b");
        assert_eq!(rows[0].deprec_time, 2);
    }

    #[test]
    fn from_alive_preserves_fields_but_sets_deprec_time() {
        let alive = super::super::object::Object {
            oid: "a".to_string(),
            uuid: "u1".to_string(),
            version: 1,
            user_md: json!({"k": 1}),
            grouping: Some("g".to_string()),
            size: 5,
            creation_time: 9,
        };
        let deprec = from_alive(&alive, 42);
        assert_eq!(deprec.oid, "a");
        assert_eq!(deprec.size, 5);
        assert_eq!(deprec.deprec_time, 42);
    }
}
