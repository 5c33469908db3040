//! Generic CRUD facade (component D, §4.D): the dispatcher other crates
//! call instead of reaching into `entities::*` directly.
//!
//! Batch mutations wrap a manual `BEGIN; ... COMMIT;` around a sequence of
//! already-written per-row codec calls (`entities::*::insert`, `::update`,
//! `::delete`), rolling back on the first failure — the literal shape of
//! §4.A's `execute-in-transaction(stmt)` contract. This is deliberately
//! simpler than nesting a `rusqlite::Transaction` guard: a `Transaction`
//! borrows the connection mutably for its whole lifetime, which would make
//! it impossible to keep calling `Handle`-level codec functions from
//! inside the batch loop. Single-entity multi-statement operations that
//! never need to re-enter a codec function (`entities::extent::migrate`,
//! [`rename_object`]) use [`Handle::execute_in_transaction`] instead, since
//! those only ever issue raw SQL through the `Transaction` they're handed.

use crate::entities::{copy, deprecated_object, device, extent, layout, log, medium, object, EntityKind};
use crate::error::{DssError, Result};
use crate::filter::compile;
use crate::lock::{self, LockType};
use crate::store::Handle;
use crate::time;
use serde_json::Value;

/// Run `body`, issuing `BEGIN`/`COMMIT` around it and `ROLLBACK` on the
/// first error. The original error is always what's returned; a rollback
/// failure is relayed as a notice only (mirrors `Handle::execute_in_transaction`).
fn in_transaction<F>(handle: &mut Handle, body: F) -> Result<()>
where
    F: FnOnce(&mut Handle) -> Result<()>,
{
    handle.execute("BEGIN", &[])?;
    match body(handle) {
        Ok(()) => {
            handle.execute("COMMIT", &[])?;
            Ok(())
        }
        Err(e) => {
            if let Err(rollback_err) = handle.execute("ROLLBACK", &[]) {
                handle.notify(&format!("rollback failed: {rollback_err}"));
            }
            Err(e)
        }
    }
}

/// A decoded row of any entity kind, returned by [`get`].
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Object(object::Object),
    DeprecatedObject(deprecated_object::DeprecatedObject),
    Copy(copy::CopyRecord),
    Layout(layout::LayoutEntry),
    Extent(extent::Extent),
    Medium(medium::Medium),
    Device(device::Device),
}

/// `get(type, [filters], [sort]) → (list, count)` (§4.D). At most two
/// compiled filter fragments are accepted; entities that reject a second
/// fragment propagate `NotSupported` from their codec's `select`. No
/// entity codec's `select` takes a sort descriptor directly — ordering by
/// a plain column belongs in the predicate fragment itself (e.g. an `ORDER
/// BY` suffix compiled alongside the `WHERE` clause), and the one sort the
/// specification calls out as needing an in-memory pass (full layouts by
/// aggregate size) is a distinct entry point,
/// [`entities::layout::full_layouts_sorted_by_size`], not reachable
/// through this generic facade.
pub fn get(handle: &Handle, kind: EntityKind, filters: &[Value]) -> Result<Vec<Row>> {
    let mut compiled = Vec::with_capacity(filters.len());
    for f in filters {
        compiled.push(compile(f)?);
    }
    let first = compiled.first().map(String::as_str);
    let second = compiled.get(1).map(String::as_str);

    let rows = match kind {
        EntityKind::Object => object::select(handle, first, second)?.into_iter().map(Row::Object).collect(),
        EntityKind::DeprecatedObject => deprecated_object::select(handle, first, second)?
            .into_iter()
            .map(Row::DeprecatedObject)
            .collect(),
        EntityKind::Copy => copy::select(handle, first, second)?.into_iter().map(Row::Copy).collect(),
        EntityKind::Layout => layout::select(handle, first, second)?.into_iter().map(Row::Layout).collect(),
        EntityKind::Extent => extent::select(handle, first, second)?.into_iter().map(Row::Extent).collect(),
        EntityKind::Medium => medium::select(handle, first, second)?.into_iter().map(Row::Medium).collect(),
        EntityKind::Device => device::select(handle, first, second)?.into_iter().map(Row::Device).collect(),
    };
    Ok(rows)
}

/// Insert a homogeneous batch of objects, transactionally.
pub fn insert_objects(handle: &mut Handle, items: &[object::Object]) -> Result<()> {
    in_transaction(handle, |h| {
        for item in items {
            object::insert(h, item)?;
        }
        Ok(())
    })
}

/// Delete a homogeneous batch of media by key, transactionally.
pub fn delete_media(handle: &mut Handle, keys: &[(String, String, String)]) -> Result<()> {
    in_transaction(handle, |h| {
        for (family, name, library) in keys {
            medium::delete(h, family, name, library)?;
        }
        Ok(())
    })
}

/// `update(type, src, dst, field_mask)` for objects: `src` supplies the
/// key (`oid`), `dst` the new values. A zero mask is a no-op per item, not
/// an error at the batch level (§4.D) — the per-item `InvalidData` that
/// `entities::object::update` would raise is still surfaced for a non-empty
/// mask that fails partway through the batch.
pub fn update_objects(handle: &mut Handle, src: &[String], dst: &[object::Object], fields: object::UpdateFields) -> Result<()> {
    if src.len() != dst.len() {
        return Err(DssError::invalid_data("src and dst batches must be the same length"));
    }
    if fields.is_empty() {
        return Ok(());
    }
    in_transaction(handle, |h| {
        for (oid, new) in src.iter().zip(dst) {
            object::update(h, oid, new, fields)?;
        }
        Ok(())
    })
}

/// Move an alive object into the deprecated table (§3 "alive→deprecated
/// transition"). Atomic: delete from `object`, insert into
/// `deprecated_object`, in one transaction.
pub fn deprecate_object(handle: &mut Handle, oid: &str) -> Result<()> {
    in_transaction(handle, |h| {
        let rows = object::select(h, Some(&format!("oid = {}", crate::store::escape_literal(Some(oid)))), None)?;
        let alive = rows
            .into_iter()
            .next()
            .ok_or_else(|| DssError::not_found(format!("no alive object with oid {oid}")))?;
        let deprecated = deprecated_object::from_alive(&alive, time::now_epoch());
        deprecated_object::insert(h, &deprecated)?;
        object::delete(h, oid)?;
        Ok(())
    })
}

/// Move a deprecated object back to alive. Fails `Conflict` if an alive
/// row already holds the target oid (§3 "must not collide on oid").
pub fn undeprecate_object(handle: &mut Handle, uuid: &str, version: i64) -> Result<()> {
    in_transaction(handle, |h| {
        let rows = deprecated_object::select(
            h,
            Some(&format!(
                "uuid = {} AND version = {}",
                crate::store::escape_literal(Some(uuid)),
                version
            )),
            None,
        )?;
        let deprecated = rows
            .into_iter()
            .next()
            .ok_or_else(|| DssError::not_found(format!("no deprecated object ({uuid}, {version})")))?;
        let existing = object::select(
            h,
            Some(&format!("oid = {}", crate::store::escape_literal(Some(&deprecated.oid)))),
            None,
        )?;
        if !existing.is_empty() {
            return Err(DssError::conflict(format!("oid {} already alive", deprecated.oid)));
        }
        object::insert(
            h,
            &object::Object {
                oid: deprecated.oid,
                uuid: deprecated.uuid.clone(),
                version: deprecated.version,
                user_md: deprecated.user_md,
                grouping: deprecated.grouping,
                size: deprecated.size,
                creation_time: deprecated.creation_time,
            },
        )?;
        deprecated_object::delete(h, &deprecated.uuid, deprecated.version)?;
        Ok(())
    })
}

/// Rename an alive object from `old_oid` to `new_oid` (§4.C "Object
/// rename"). Acquires object-scoped locks on both oids, renames in both
/// the alive and deprecated tables in one transaction, then releases the
/// locks. Lock-release failure after a committed rename is surfaced to the
/// caller but the rename itself remains committed (§4.C).
pub fn rename_object(handle: &mut Handle, old_oid: &str, new_oid: &str, hostname: &str, owner: i64) -> Result<()> {
    let ids = vec![old_oid.to_string(), new_oid.to_string()];
    lock::lock(handle, LockType::Object, &ids, hostname, owner)?;

    let rename_result = in_transaction(handle, |h| {
        let existing = object::select(h, Some(&format!("oid = {}", crate::store::escape_literal(Some(new_oid)))), None)?;
        if !existing.is_empty() {
            return Err(DssError::conflict(format!("oid {new_oid} already exists")));
        }
        let affected = h.execute(
            "UPDATE object SET oid = ?1 WHERE oid = ?2",
            &[&new_oid, &old_oid],
        )?;
        if affected == 0 {
            return Err(DssError::not_found(format!("no alive object with oid {old_oid}")));
        }
        let _ = h.execute(
            "UPDATE deprecated_object SET oid = ?1 WHERE oid = ?2",
            &[&new_oid, &old_oid],
        )?;
        Ok(())
    });

    lock::unlock(handle, LockType::Object, &ids, hostname, owner, false)?;
    rename_result
}

/// Append a log record directly (rare; most callers go through
/// [`crate::health::emit_log`], which also applies provenance wrapping).
pub fn insert_log(handle: &mut Handle, record: &log::LogRecord) -> Result<()> {
    log::insert(handle, record)
}
