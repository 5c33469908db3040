//! Lock acquire/refresh/release/status over the shared `lock` table (§4.E).
//!
//! Bulk operations (`refresh`, `unlock`, `status`) process every item even
//! after one fails, keeping the first error to return, per §7's
//! accumulation rule for bulk lock loops. `lock`/`lock_weak` are the
//! exception: on any failure they force-roll-back everything inserted so
//! far in the same call, in reverse order, so a partial batch acquire
//! never lingers.

use super::{LockType, StoredLockType};
use crate::error::{DssError, ErrorKind, Result};
use crate::store::Handle;
use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Absent,
    Weak,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub id: String,
    pub state: LockState,
    pub hostname: Option<String>,
    pub owner: i64,
    pub ts: Option<i64>,
    pub last_locate: Option<i64>,
}

impl LockInfo {
    fn absent(id: &str) -> Self {
        LockInfo {
            id: id.to_string(),
            state: LockState::Absent,
            hostname: None,
            owner: 0,
            ts: None,
            last_locate: None,
        }
    }
}

struct RawRow {
    hostname: Option<String>,
    owner: Option<i64>,
    ts: i64,
    last_locate: Option<i64>,
    is_weak: bool,
}

fn fetch(handle: &Handle, stored: StoredLockType, id: &str) -> Result<Option<RawRow>> {
    let rows = handle.query(
        "SELECT hostname, owner, ts, last_locate, is_weak FROM lock WHERE lock_type = ?1 AND lock_id = ?2",
        &[&stored.as_str(), &id],
        |row| {
            Ok(RawRow {
                hostname: row.get(0)?,
                owner: row.get(1)?,
                ts: row.get(2)?,
                last_locate: row.get(3)?,
                is_weak: row.get::<_, i64>(4)? != 0,
            })
        },
    )?;
    Ok(rows.into_iter().next())
}

fn owned_by(row: &RawRow, hostname: &str, owner: i64) -> bool {
    row.hostname.as_deref() == Some(hostname) && row.owner == Some(owner)
}

/// Insert one strong row per id. On any failure, force-remove every row
/// already inserted by this call (reverse order) before propagating the
/// error; a duplicate id surfaces as `Conflict` through the normal
/// constraint-violation mapping.
pub fn lock(handle: &mut Handle, lock_type: LockType, ids: &[String], hostname: &str, owner: i64) -> Result<()> {
    insert_batch(handle, lock_type, ids, hostname, Some(owner), false)
}

/// Like [`lock`], but rows are marked weak and carry no owner; `last_locate`
/// is stamped to now (§4.E).
pub fn lock_weak(handle: &mut Handle, lock_type: LockType, ids: &[String], hostname: &str) -> Result<()> {
    insert_batch(handle, lock_type, ids, hostname, None, true)
}

fn insert_batch(
    handle: &mut Handle,
    lock_type: LockType,
    ids: &[String],
    hostname: &str,
    owner: Option<i64>,
    weak: bool,
) -> Result<()> {
    let stored = lock_type.storage_class();
    let now = time::now_epoch();
    let mut inserted = Vec::with_capacity(ids.len());
    for id in ids {
        let last_locate = if weak { Some(now) } else { None };
        let result = handle.execute(
            "INSERT INTO lock (lock_type, lock_id, hostname, owner, ts, last_locate, is_weak)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &[
                &stored.as_str(),
                &id,
                &hostname,
                &owner,
                &now,
                &last_locate,
                &(weak as i64),
            ],
        );
        match result {
            Ok(_) => inserted.push(id.clone()),
            Err(e) => {
                for done in inserted.iter().rev() {
                    let _ = handle.execute(
                        "DELETE FROM lock WHERE lock_type = ?1 AND lock_id = ?2",
                        &[&stored.as_str(), done],
                    );
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Refresh `ts` (or `last_locate` when `locate` is set) on every id,
/// continuing past per-item failures and returning the first one.
pub fn refresh(handle: &mut Handle, lock_type: LockType, ids: &[String], locate: bool, hostname: &str, owner: i64) -> Result<()> {
    let stored = lock_type.storage_class();
    let now = time::now_epoch();
    let mut first_error = None;
    for id in ids {
        let outcome = (|| -> Result<()> {
            let row = fetch(handle, stored, id)?
                .ok_or_else(|| DssError::no_lock(format!("no lock for {id}")))?;
            if !row.is_weak && !owned_by(&row, hostname, owner) {
                return Err(DssError::access_denied(format!("lock {id} not owned by {hostname}/{owner}")));
            }
            let column = if locate { "last_locate" } else { "ts" };
            let stmt = format!("UPDATE lock SET {column} = ?1 WHERE lock_type = ?2 AND lock_id = ?3");
            handle.execute(&stmt, &[&now, &stored.as_str(), id])?;
            Ok(())
        })();
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Upsert semantics: take ownership of a weak lock held on `hostname`, or
/// no-op on a strong lock already owned by `(hostname, owner)`; insert a
/// fresh strong row if absent (§4.E).
pub fn refresh_take_ownership(handle: &mut Handle, lock_type: LockType, ids: &[String], hostname: &str, owner: i64) -> Result<()> {
    let stored = lock_type.storage_class();
    let now = time::now_epoch();
    let mut first_error = None;
    for id in ids {
        let outcome: Result<()> = match fetch(handle, stored, id)? {
            None => handle
                .execute(
                    "INSERT INTO lock (lock_type, lock_id, hostname, owner, ts, last_locate, is_weak)
                     VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0)",
                    &[&stored.as_str(), &id, &hostname, &owner, &now],
                )
                .map(|_| ())
                .map_err(Into::into),
            Some(row) if row.is_weak && row.hostname.as_deref() == Some(hostname) => handle
                .execute(
                    "UPDATE lock SET owner = ?1, is_weak = 0, ts = ?2 WHERE lock_type = ?3 AND lock_id = ?4",
                    &[&owner, &now, &stored.as_str(), id],
                )
                .map(|_| ())
                .map_err(Into::into),
            Some(row) if !row.is_weak && owned_by(&row, hostname, owner) => Ok(()),
            Some(_) => Err(DssError::access_denied(format!("lock {id} held by another owner"))),
        };
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Delete matching rows; unforced requires ownership unless weak.
pub fn unlock(handle: &mut Handle, lock_type: LockType, ids: &[String], hostname: &str, owner: i64, force: bool) -> Result<()> {
    let stored = lock_type.storage_class();
    let mut first_error = None;
    for id in ids {
        let outcome = (|| -> Result<()> {
            let row = fetch(handle, stored, id)?
                .ok_or_else(|| DssError::no_lock(format!("no lock for {id}")))?;
            if !force && !row.is_weak && !owned_by(&row, hostname, owner) {
                return Err(DssError::access_denied(format!("lock {id} not owned by {hostname}/{owner}")));
            }
            let affected = handle.execute(
                "DELETE FROM lock WHERE lock_type = ?1 AND lock_id = ?2",
                &[&stored.as_str(), id],
            )?;
            if affected == 0 {
                return Err(DssError::no_lock(format!("no lock for {id}")));
            }
            Ok(())
        })();
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Read-only status for each id. Absent rows are reported as
/// [`LockState::Absent`] (`hostname = None`, `owner = 0`) rather than as an
/// error: unlike `refresh`/`unlock`, a status query has no mutation to
/// fail, so this crate treats "no such lock" as informative output, not a
/// `NoLock` error (an explicit deviation from the literal prose, recorded
/// in `DESIGN.md`).
pub fn status(handle: &Handle, lock_type: LockType, ids: &[String]) -> Result<Vec<LockInfo>> {
    let stored = lock_type.storage_class();
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        out.push(match fetch(handle, stored, id)? {
            None => LockInfo::absent(id),
            Some(row) => LockInfo {
                id: id.clone(),
                state: if row.is_weak { LockState::Weak } else { LockState::Strong },
                hostname: row.hostname,
                owner: row.owner.unwrap_or(0),
                ts: Some(row.ts),
                last_locate: row.last_locate,
            },
        });
    }
    Ok(out)
}

/// Garbage-collect device locks this `hostname` holds whose device has
/// since moved to a different host, or whose recorded owner no longer
/// matches the caller's current process id (a restart).
pub fn clean_device_locks(handle: &mut Handle, family: &str, hostname: &str, owner: i64) -> Result<usize> {
    let devices = crate::entities::device::select(
        handle,
        Some(&format!("family = {}", crate::store::escape_literal(Some(family)))),
        None,
    )?;
    let mut removed = 0;
    for device in devices {
        let id = super::id::build(&device.name, Some(&device.library))?;
        let Some(row) = fetch(handle, StoredLockType::Device, &id)? else {
            continue;
        };
        if row.hostname.as_deref() != Some(hostname) {
            continue;
        }
        let stale = device.host != hostname || row.owner != Some(owner);
        if stale {
            removed += handle.execute(
                "DELETE FROM lock WHERE lock_type = 'DEVICE' AND lock_id = ?1",
                &[&id],
            )?;
        }
    }
    Ok(removed)
}

/// Garbage-collect medium locks held by `hostname` under a different
/// `owner` that are not in `active_media_ids`, plus every medium-update
/// lock held by `hostname` (those never survive a daemon restart).
pub fn clean_media_locks(handle: &mut Handle, hostname: &str, owner: i64, active_media_ids: &[String]) -> Result<usize> {
    let candidates: Vec<String> = handle.query(
        "SELECT lock_id FROM lock WHERE lock_type = 'MEDIUM' AND hostname = ?1 AND (owner IS NULL OR owner != ?2)",
        &[&hostname, &owner],
        |row| row.get(0),
    )?;
    let mut removed = 0;
    for id in candidates {
        if active_media_ids.contains(&id) {
            continue;
        }
        removed += handle.execute(
            "DELETE FROM lock WHERE lock_type = 'MEDIUM' AND lock_id = ?1 AND hostname = ?2",
            &[&id, &hostname],
        )?;
    }
    removed += handle.execute(
        "DELETE FROM lock WHERE lock_type = 'MEDIUM_UPDATE' AND hostname = ?1",
        &[&hostname],
    )?;
    Ok(removed)
}

/// Administrative: truncate the lock table.
pub fn purge_all(handle: &mut Handle) -> Result<usize> {
    Ok(handle.execute("DELETE FROM lock", &[])?)
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

    #[test]
    fn lock_then_duplicate_fails_conflict() {
        let (_dir, mut handle) = opened();
        lock(&mut handle, LockType::Object, &["foo".to_string()], "h1", 1).unwrap();
        let err = lock(&mut handle, LockType::Object, &["foo".to_string()], "h2", 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn lock_unlock_then_relock_succeeds() {
        let (_dir, mut handle) = opened();
        let ids = vec!["foo".to_string()];
        lock(&mut handle, LockType::Object, &ids, "h1", 1).unwrap();
        unlock(&mut handle, LockType::Object, &ids, "h1", 1, false).unwrap();
        lock(&mut handle, LockType::Object, &ids, "h2", 2).unwrap();
    }

    #[test]
    fn partial_batch_failure_rolls_back_earlier_inserts() {
        let (_dir, mut handle) = opened();
        lock(&mut handle, LockType::Object, &["dup".to_string()], "h1", 1).unwrap();
        let ids = vec!["fresh".to_string(), "dup".to_string()];
        let err = lock(&mut handle, LockType::Object, &ids, "h2", 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        // "fresh" must have been rolled back
        let status_rows = status(&handle, LockType::Object, &["fresh".to_string()]).unwrap();
        assert_eq!(status_rows[0].state, LockState::Absent);
    }

    #[test]
    fn refresh_by_non_owner_fails_access_denied() {
        let (_dir, mut handle) = opened();
        let ids = vec!["foo".to_string()];
        lock(&mut handle, LockType::Object, &ids, "h1", 1).unwrap();
        let err = refresh(&mut handle, LockType::Object, &ids, false, "h2", 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
    }

    #[test]
    fn refresh_absent_lock_fails_no_lock() {
        let (_dir, mut handle) = opened();
        let err = refresh(&mut handle, LockType::Object, &["ghost".to_string()], false, "h1", 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoLock);
    }

    #[test]
    fn status_reports_absent_without_erroring() {
        let (_dir, handle) = opened();
        let rows = status(&handle, LockType::Object, &["ghost".to_string()]).unwrap();
        assert_eq!(rows[0].state, LockState::Absent);
        assert_eq!(rows[0].owner, 0);
    }

    #[test]
    fn weak_lock_can_be_refreshed_by_anyone() {
        let (_dir, mut handle) = opened();
        let ids = vec!["foo".to_string()];
        lock_weak(&mut handle, LockType::Object, &ids, "h1").unwrap();
        refresh(&mut handle, LockType::Object, &ids, true, "anyone", 99).unwrap();
    }

    #[test]
    fn refresh_take_ownership_is_idempotent() {
        let (_dir, mut handle) = opened();
        let ids = vec!["foo".to_string()];
        lock_weak(&mut handle, LockType::Object, &ids, "h1").unwrap();
        refresh_take_ownership(&mut handle, LockType::Object, &ids, "h1", 1).unwrap();
        refresh_take_ownership(&mut handle, LockType::Object, &ids, "h1", 1).unwrap();
        let rows = status(&handle, LockType::Object, &ids).unwrap();
        assert_eq!(rows[0].state, LockState::Strong);
        assert_eq!(rows[0].owner, 1);
    }

    #[test]
    fn deprec_and_object_locks_share_storage_class() {
        let (_dir, mut handle) = opened();
        lock(&mut handle, LockType::Deprec, &["foo".to_string()], "h1", 1).unwrap();
        let err = lock(&mut handle, LockType::Object, &["foo".to_string()], "h2", 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn purge_all_clears_every_row() {
        let (_dir, mut handle) = opened();
        lock(&mut handle, LockType::Object, &["foo".to_string()], "h1", 1).unwrap();
        purge_all(&mut handle).unwrap();
        let rows = status(&handle, LockType::Object, &["foo".to_string()]).unwrap();
        assert_eq!(rows[0].state, LockState::Absent);
    }
}
