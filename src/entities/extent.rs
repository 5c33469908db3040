//! The Extent table (§3 "Extent") — a physical byte range on a medium.

use crate::error::{DssError, Result};
use crate::store::Handle;
use rusqlite::Row;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Sync,
    Orphan,
}

impl State {
    fn as_str(self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Sync => "sync",
            State::Orphan => "orphan",
        }
    }

    fn parse(s: &str) -> rusqlite::Result<Self> {
        match s {
            "pending" => Ok(State::Pending),
            "sync" => Ok(State::Sync),
            "orphan" => Ok(State::Orphan),
            other => Err(rusqlite::Error::InvalidColumnType(
                3,
                format!("unrecognized extent state '{other}'"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

/// Optional digests, each a fixed-length byte digest encoded as hex (§9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hash {
    pub md5: Option<[u8; 16]>,
    pub xxh128: Option<[u8; 16]>,
}

impl Hash {
    pub fn encode(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(d) = self.md5 {
            obj.insert("md5".to_string(), Value::String(hex_encode(&d)));
        }
        if let Some(d) = self.xxh128 {
            obj.insert("xxh128".to_string(), Value::String(hex_encode(&d)));
        }
        Value::Object(obj)
    }

    pub fn decode(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::Null => return Ok(Hash::default()),
            Value::Object(o) => o,
            _ => return Err(DssError::invalid_data("extent hash must be a JSON object")),
        };
        let md5 = obj.get("md5").map(|v| hex_decode_16(v)).transpose()?;
        let xxh128 = obj.get("xxh128").map(|v| hex_decode_16(v)).transpose()?;
        Ok(Hash { md5, xxh128 })
    }
}

fn hex_encode(bytes: &[u8; 16]) -> String {
    let mut s = String::with_capacity(32);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn hex_decode_16(value: &Value) -> Result<[u8; 16]> {
    let s = value
        .as_str()
        .ok_or_else(|| DssError::invalid_data("extent hash entry must be a hex string"))?;
    if s.len() != 32 {
        return Err(DssError::invalid_data(format!(
            "extent hash must be 32 hex chars, got {}",
            s.len()
        )));
    }
    let mut out = [0u8; 16];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let byte_str = std::str::from_utf8(chunk).map_err(|_| DssError::invalid_data("invalid hex in extent hash"))?;
        out[i] = u8::from_str_radix(byte_str, 16).map_err(|_| DssError::invalid_data("invalid hex in extent hash"))?;
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    pub uuid: String,
    pub size: i64,
    pub offset: i64,
    pub state: State,
    pub medium_family: String,
    pub medium_name: String,
    pub medium_library: String,
    pub address: String,
    pub hash: Hash,
    pub info: Value,
    pub creation_time: i64,
}

pub fn insert(handle: &mut Handle, extent: &Extent) -> Result<()> {
    let hash_str = extent.hash.encode().to_string();
    let info_str = extent.info.to_string();
    handle.execute(
        "INSERT INTO extent
            (uuid, size, offset_bytes, state, medium_family, medium_name, medium_library, address, hash, info, creation_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        &[
            &extent.uuid,
            &extent.size,
            &extent.offset,
            &extent.state.as_str(),
            &extent.medium_family,
            &extent.medium_name,
            &extent.medium_library,
            &extent.address,
            &hash_str,
            &info_str,
            &extent.creation_time,
        ],
    )?;
    Ok(())
}

pub fn update_state(handle: &mut Handle, uuid: &str, state: State) -> Result<()> {
    let affected = handle.execute(
        "UPDATE extent SET state = ?1 WHERE uuid = ?2",
        &[&state.as_str(), &uuid],
    )?;
    if affected == 0 {
        return Err(DssError::not_found(format!("no extent with uuid {uuid}")));
    }
    Ok(())
}

pub fn delete(handle: &mut Handle, uuid: &str) -> Result<()> {
    let affected = handle.execute("DELETE FROM extent WHERE uuid = ?1", &[&uuid])?;
    if affected == 0 {
        return Err(DssError::not_found(format!("no extent with uuid {uuid}")));
    }
    Ok(())
}

pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<Extent>> {
    if second.is_some() {
        return Err(DssError::not_supported("extent select accepts only one predicate fragment"));
    }
    let mut stmt = "SELECT uuid, size, offset_bytes, state, medium_family, medium_name, medium_library, address, hash, info, creation_time FROM extent".to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    handle.query(&stmt, &[], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<Extent> {
    let state_raw: String = row.get(3)?;
    let hash_raw: String = row.get(8)?;
    let info_raw: String = row.get(9)?;
    let hash_value: Value = serde_json::from_str(&hash_raw).unwrap_or(Value::Null);
    Ok(Extent {
        uuid: row.get(0)?,
        size: row.get(1)?,
        offset: row.get(2)?,
        state: State::parse(&state_raw)?,
        medium_family: row.get(4)?,
        medium_name: row.get(5)?,
        medium_library: row.get(6)?,
        address: row.get(7)?,
        hash: Hash::decode(&hash_value).unwrap_or_default(),
        info: serde_json::from_str(&info_raw).unwrap_or(Value::Null),
        creation_time: row.get(10)?,
    })
}

/// `update-extent-migrate(old, new)` (§8): moves layout references from
/// `old` to `new` in the same transaction that orphans `old` and syncs
/// `new`. Concurrent readers may observe the intermediate state (§9, open
/// question — treated as read-committed).
pub fn migrate(handle: &mut Handle, old_uuid: &str, new_uuid: &str) -> Result<()> {
    handle.execute_in_transaction(|tx| {
        tx.execute(
            "UPDATE layout SET extent_uuid = ?1 WHERE extent_uuid = ?2",
            [new_uuid, old_uuid],
        )?;
        let old_affected = tx.execute(
            "UPDATE extent SET state = 'orphan' WHERE uuid = ?1",
            [old_uuid],
        )?;
        if old_affected == 0 {
            return Err(DssError::not_found(format!("no extent with uuid {old_uuid}")));
        }
        let new_affected = tx.execute("UPDATE extent SET state = 'sync' WHERE uuid = ?1", [new_uuid])?;
        if new_affected == 0 {
            return Err(DssError::not_found(format!("no extent with uuid {new_uuid}")));
        }
        Ok(())
    })
}
