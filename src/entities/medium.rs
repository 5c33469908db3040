//! The Medium table (§3 "Medium") — a physical storage target.

use crate::error::{DssError, Result};
use crate::lock::{self, LockType};
use crate::models;
use crate::store::Handle;
use rusqlite::Row;

/// Bounded retry budget for acquiring the per-medium update lock before a
/// stats read-modify-write (§5 "Stats update path").
const MAX_UPDATE_LOCK_TRY: u32 = 5;
const UPDATE_LOCK_SLEEP_MICRO_SECONDS: u64 = 2_000;

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
                4,
                format!("unrecognized admin status '{other}'"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

/// Per-operation access flags and fs metadata, and the orthogonal label
/// sets attached to a medium for placement policy (§3 Grouping / Tag).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub nb_obj: i64,
    pub logc_spc_used: i64,
    pub phys_spc_used: i64,
    pub phys_spc_free: i64,
    pub nb_load: i64,
    pub nb_errors: i64,
    pub last_load: i64,
}

impl Stats {
    /// Merge `delta` into `self` per the arithmetic rule decided in
    /// `SPEC_FULL.md` §C: `nb_obj`, `logc_spc_used`, `phys_spc_used` are
    /// additive; `phys_spc_free` and `last_load` are absolute replacements;
    /// `nb_load`/`nb_errors` are additive. Every additive result clamps to
    /// zero.
    pub fn merge(&self, delta: &Stats) -> Stats {
        Stats {
            nb_obj: (self.nb_obj + delta.nb_obj).max(0),
            logc_spc_used: (self.logc_spc_used + delta.logc_spc_used).max(0),
            phys_spc_used: (self.phys_spc_used + delta.phys_spc_used).max(0),
            phys_spc_free: delta.phys_spc_free,
            nb_load: (self.nb_load + delta.nb_load).max(0),
            nb_errors: (self.nb_errors + delta.nb_errors).max(0),
            last_load: delta.last_load,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Medium {
    pub family: String,
    pub name: String,
    pub library: String,
    pub model: Option<String>,
    pub admin_status: AdminStatus,
    pub fs_type: Option<String>,
    pub fs_status: Option<String>,
    pub fs_label: Option<String>,
    pub address_type: Option<String>,
    pub put_access: bool,
    pub get_access: bool,
    pub delete_access: bool,
    pub stats: Stats,
    pub tags: Vec<String>,
    pub groupings: Vec<String>,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateFields: u16 {
        const ADMIN_STATUS = 0b0000_0001;
        const FS_STATUS    = 0b0000_0010;
        const FS_LABEL     = 0b0000_0100;
        const TAGS         = 0b0000_1000;
        const GROUPINGS    = 0b0001_0000;
        const PUT_ACCESS   = 0b0010_0000;
        const GET_ACCESS   = 0b0100_0000;
        const DELETE_ACCESS= 0b1000_0000;
        const LIBRARY      = 0b1_0000_0000;
        const STATS        = 0b10_0000_0000;
    }
}

fn encode_labels(labels: &[String]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}

/// Empty and null both decode as an empty set (§8 boundary behavior);
/// serializing an empty set always produces `[]`.
fn decode_labels(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn insert(handle: &mut Handle, medium: &Medium) -> Result<()> {
    if medium.family == "tape" {
        if let Some(model) = &medium.model {
            if !models::check(model) {
                return Err(DssError::invalid_data(format!("unsupported tape model '{model}'")));
            }
        }
    }
    let tags_str = encode_labels(&medium.tags);
    let groupings_str = encode_labels(&medium.groupings);
    handle.execute(
        "INSERT INTO medium
            (family, name, library, model, admin_status, fs_type, fs_status, fs_label, address_type,
             put_access, get_access, delete_access, nb_obj, logc_spc_used, phys_spc_used, phys_spc_free,
             nb_load, nb_errors, last_load, tags, groupings)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        &[
            &medium.family,
            &medium.name,
            &medium.library,
            &medium.model,
            &medium.admin_status.as_str(),
            &medium.fs_type,
            &medium.fs_status,
            &medium.fs_label,
            &medium.address_type,
            &(medium.put_access as i64),
            &(medium.get_access as i64),
            &(medium.delete_access as i64),
            &medium.stats.nb_obj,
            &medium.stats.logc_spc_used,
            &medium.stats.phys_spc_used,
            &medium.stats.phys_spc_free,
            &medium.stats.nb_load,
            &medium.stats.nb_errors,
            &medium.stats.last_load,
            &tags_str,
            &groupings_str,
        ],
    )?;
    Ok(())
}

pub fn delete(handle: &mut Handle, family: &str, name: &str, library: &str) -> Result<()> {
    let affected = handle.execute(
        "DELETE FROM medium WHERE family = ?1 AND name = ?2 AND library = ?3",
        &[&family, &name, &library],
    )?;
    if affected == 0 {
        return Err(DssError::not_found("no medium matches the given key"));
    }
    Ok(())
}

pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<Medium>> {
    if second.is_some() {
        return Err(DssError::not_supported("medium select accepts only one predicate fragment"));
    }
    let mut stmt = "SELECT family, name, library, model, admin_status, fs_type, fs_status, fs_label, address_type, \
         put_access, get_access, delete_access, nb_obj, logc_spc_used, phys_spc_used, phys_spc_free, \
         nb_load, nb_errors, last_load, tags, groupings FROM medium"
        .to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    handle.query(&stmt, &[], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<Medium> {
    let status_raw: String = row.get(4)?;
    let tags_raw: String = row.get(19)?;
    let groupings_raw: String = row.get(20)?;
    Ok(Medium {
        family: row.get(0)?,
        name: row.get(1)?,
        library: row.get(2)?,
        model: row.get(3)?,
        admin_status: AdminStatus::parse(&status_raw)?,
        fs_type: row.get(5)?,
        fs_status: row.get(6)?,
        fs_label: row.get(7)?,
        address_type: row.get(8)?,
        put_access: row.get::<_, i64>(9)? != 0,
        get_access: row.get::<_, i64>(10)? != 0,
        delete_access: row.get::<_, i64>(11)? != 0,
        stats: Stats {
            nb_obj: row.get(12)?,
            logc_spc_used: row.get(13)?,
            phys_spc_used: row.get(14)?,
            phys_spc_free: row.get(15)?,
            nb_load: row.get(16)?,
            nb_errors: row.get(17)?,
            last_load: row.get(18)?,
        },
        tags: decode_labels(&tags_raw),
        groupings: decode_labels(&groupings_raw),
    })
}

/// Plain-field update: everything except `stats`, which goes through
/// [`update_stats`] because it requires the medium-update lock (§4.C).
pub fn update(handle: &mut Handle, key: (&str, &str, &str), new: &Medium, fields: UpdateFields) -> Result<()> {
    if fields.is_empty() {
        return Err(DssError::invalid_data("update field mask must be non-empty"));
    }
    if fields.contains(UpdateFields::STATS) {
        return Err(DssError::invalid_data(
            "stats updates must go through update_stats, not the plain field mask",
        ));
    }
    let mut sets = Vec::new();
    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
    let tags_str = encode_labels(&new.tags);
    let groupings_str = encode_labels(&new.groupings);
    let admin_status = new.admin_status.as_str();
    if fields.contains(UpdateFields::ADMIN_STATUS) {
        sets.push("admin_status = ?");
        params.push(&admin_status);
    }
    if fields.contains(UpdateFields::FS_STATUS) {
        sets.push("fs_status = ?");
        params.push(&new.fs_status);
    }
    if fields.contains(UpdateFields::FS_LABEL) {
        sets.push("fs_label = ?");
        params.push(&new.fs_label);
    }
    if fields.contains(UpdateFields::TAGS) {
        sets.push("tags = ?");
        params.push(&tags_str);
    }
    if fields.contains(UpdateFields::GROUPINGS) {
        sets.push("groupings = ?");
        params.push(&groupings_str);
    }
    if fields.contains(UpdateFields::PUT_ACCESS) {
        sets.push("put_access = ?");
        params.push(&new.put_access);
    }
    if fields.contains(UpdateFields::GET_ACCESS) {
        sets.push("get_access = ?");
        params.push(&new.get_access);
    }
    if fields.contains(UpdateFields::DELETE_ACCESS) {
        sets.push("delete_access = ?");
        params.push(&new.delete_access);
    }
    if fields.contains(UpdateFields::LIBRARY) {
        sets.push("library = ?");
        params.push(&new.library);
    }
    let (family, name, library) = key;
    params.push(&family);
    params.push(&name);
    params.push(&library);
    let stmt = format!(
        "UPDATE medium SET {} WHERE family = ? AND name = ? AND library = ?",
        sets.join(", ")
    );
    let affected = handle.execute(&stmt, &params)?;
    if affected == 0 {
        return Err(DssError::not_found("no medium matches the given key"));
    }
    Ok(())
}

/// Stats update: acquires the medium-update lock with bounded retry, reads
/// the current row, merges `delta` per [`Stats::merge`], and writes the
/// result back, all while holding the lock (§4.C, §5).
pub fn update_stats(handle: &mut Handle, key: (&str, &str, &str), delta: &Stats, hostname: &str, owner: i64) -> Result<()> {
    let (family, name, library) = key;
    let lock_id = crate::lock::id::build(name, Some(library))?;
    let mut acquired = false;
    for attempt in 0..MAX_UPDATE_LOCK_TRY {
        match lock::lock(handle, LockType::MediumUpdate, &[lock_id.clone()], hostname, owner) {
            Ok(()) => {
                acquired = true;
                break;
            }
            Err(e) if e.kind == crate::error::ErrorKind::Conflict && attempt + 1 < MAX_UPDATE_LOCK_TRY => {
                std::thread::sleep(std::time::Duration::from_micros(UPDATE_LOCK_SLEEP_MICRO_SECONDS));
            }
            Err(e) => return Err(e),
        }
    }
    if !acquired {
        return Err(DssError::conflict("could not acquire medium-update lock within retry budget"));
    }

    let result = (|| -> Result<()> {
        let current = select(
            handle,
            Some(&format!(
                "family = {} AND name = {} AND library = {}",
                crate::store::escape_literal(Some(family)),
                crate::store::escape_literal(Some(name)),
                crate::store::escape_literal(Some(library)),
            )),
            None,
        )?
        .into_iter()
        .next()
        .ok_or_else(|| DssError::not_found("no medium matches the given key"))?;
        let merged = current.stats.merge(delta);
        handle.execute(
            "UPDATE medium SET nb_obj = ?1, logc_spc_used = ?2, phys_spc_used = ?3, phys_spc_free = ?4,
                nb_load = ?5, nb_errors = ?6, last_load = ?7
             WHERE family = ?8 AND name = ?9 AND library = ?10",
            &[
                &merged.nb_obj,
                &merged.logc_spc_used,
                &merged.phys_spc_used,
                &merged.phys_spc_free,
                &merged.nb_load,
                &merged.nb_errors,
                &merged.last_load,
                &family,
                &name,
                &library,
            ],
        )?;
        Ok(())
    })();

    let _ = lock::unlock(handle, LockType::MediumUpdate, &[lock_id], hostname, owner, false);
    result
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

    fn sample() -> Medium {
        Medium {
            family: "tape".to_string(),
            name: "L00001".to_string(),
            library: "lib0".to_string(),
            model: Some("LTO8".to_string()),
            admin_status: AdminStatus::Unlocked,
            fs_type: None,
            fs_status: None,
            fs_label: None,
            address_type: None,
            put_access: true,
            get_access: true,
            delete_access: true,
            stats: Stats::default(),
            tags: vec![],
            groupings: vec![],
        }
    }

    #[test]
    fn insert_and_reread_matches_literal_scenario() {
        models::ensure_test_models();
        let (_dir, mut handle) = opened();
        insert(&mut handle, &sample()).unwrap();
        let rows = select(
            &handle,
            Some("family = 'tape' AND name = 'L00001' AND library = 'lib0'"),
            None,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].model.as_deref(), Some("LTO8"));
        assert_eq!(rows[0].stats.phys_spc_free, 0);
    }

    #[test]
    fn insert_rejects_unsupported_tape_model() {
        models::ensure_test_models();
        let (_dir, mut handle) = opened();
        let mut medium = sample();
        medium.name = "unique-for-this-test".to_string();
        medium.model = Some("NOT-A-REAL-MODEL".to_string());
        let err = insert(&mut handle, &medium).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidData);
    }

    #[test]
    fn stats_merge_applies_additive_and_absolute_rules() {
        let current = Stats {
            nb_obj: 5,
            logc_spc_used: 100,
            phys_spc_used: 100,
            phys_spc_free: 50,
            nb_load: 2,
            nb_errors: 0,
            last_load: 10,
        };
        let delta = Stats {
            nb_obj: 1,
            logc_spc_used: 10,
            phys_spc_used: 10,
            phys_spc_free: 30,
            nb_load: 1,
            nb_errors: 1,
            last_load: 20,
        };
        let merged = current.merge(&delta);
        assert_eq!(merged.nb_obj, 6);
        assert_eq!(merged.phys_spc_free, 30);
        assert_eq!(merged.last_load, 20);
        assert_eq!(merged.nb_errors, 1);
    }

    #[test]
    fn stats_merge_clamps_additive_fields_to_zero() {
        let current = Stats { nb_obj: 1, ..Stats::default() };
        let delta = Stats { nb_obj: -5, ..Stats::default() };
        assert_eq!(current.merge(&delta).nb_obj, 0);
    }

    #[test]
    fn update_stats_round_trips_through_the_lock() {
        let (_dir, mut handle) = opened();
        insert(&mut handle, &sample()).unwrap();
        update_stats(
            &mut handle,
            ("tape", "L00001", "lib0"),
            &Stats { nb_load: 1, ..Stats::default() },
            "h1",
            1,
        )
        .unwrap();
        let rows = select(&handle, Some("name = 'L00001'"), None).unwrap();
        assert_eq!(rows[0].stats.nb_load, 1);
    }

    #[test]
    fn empty_and_null_tags_both_decode_empty() {
        assert_eq!(decode_labels("[]"), Vec::<String>::new());
        assert_eq!(decode_labels("null"), Vec::<String>::new());
    }
}
