//! The Layout table (§3 "Layout") — ordered extent membership of a copy.

use super::extent::{self, Extent};
use crate::error::{DssError, Result};
use crate::store::Handle;
use rusqlite::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub object_uuid: String,
    pub version: i64,
    pub copy_name: String,
    pub extent_uuid: String,
    pub layout_index: i64,
}

pub fn insert(handle: &mut Handle, entry: &LayoutEntry) -> Result<()> {
    handle.execute(
        "INSERT INTO layout (object_uuid, version, copy_name, extent_uuid, layout_index)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        &[
            &entry.object_uuid,
            &entry.version,
            &entry.copy_name,
            &entry.extent_uuid,
            &entry.layout_index,
        ],
    )?;
    Ok(())
}

pub fn delete(handle: &mut Handle, object_uuid: &str, version: i64, copy_name: &str, extent_uuid: &str) -> Result<()> {
    let affected = handle.execute(
        "DELETE FROM layout WHERE object_uuid = ?1 AND version = ?2 AND copy_name = ?3 AND extent_uuid = ?4",
        &[&object_uuid, &version, &copy_name, &extent_uuid],
    )?;
    if affected == 0 {
        return Err(DssError::not_found("no layout entry matches the given key"));
    }
    Ok(())
}

pub fn select(handle: &Handle, predicate: Option<&str>, second: Option<&str>) -> Result<Vec<LayoutEntry>> {
    if second.is_some() {
        return Err(DssError::not_supported("layout select accepts only one predicate fragment"));
    }
    let mut stmt = "SELECT object_uuid, version, copy_name, extent_uuid, layout_index FROM layout".to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    stmt.push_str(" ORDER BY layout_index ASC");
    handle.query(&stmt, &[], from_row)
}

pub fn from_row(row: &Row) -> rusqlite::Result<LayoutEntry> {
    Ok(LayoutEntry {
        object_uuid: row.get(0)?,
        version: row.get(1)?,
        copy_name: row.get(2)?,
        extent_uuid: row.get(3)?,
        layout_index: row.get(4)?,
    })
}

/// A copy's full layout: its ordered extents plus their aggregated size.
#[derive(Debug, Clone, PartialEq)]
pub struct FullLayout {
    pub object_uuid: String,
    pub version: i64,
    pub copy_name: String,
    pub extents: Vec<Extent>,
    pub size: i64,
}

/// Full-layout select (§4.C): joins `layout` to `extent` for the copy key,
/// orders by `layout_index`, decodes each extent, and sums sizes. The join
/// and ordering happen in SQL; only the final cross-copy size sort (via
/// [`sort_by_size`]) happens in memory, per the specification's "sorting
/// by size must be done in-memory after decoding" note.
pub fn full_layout(handle: &Handle, object_uuid: &str, version: i64, copy_name: &str) -> Result<FullLayout> {
    let entries = handle.query(
        "SELECT e.uuid, e.size, e.offset_bytes, e.state, e.medium_family, e.medium_name, e.medium_library,
                e.address, e.hash, e.info, e.creation_time
         FROM layout l JOIN extent e ON l.extent_uuid = e.uuid
         WHERE l.object_uuid = ?1 AND l.version = ?2 AND l.copy_name = ?3
         ORDER BY l.layout_index ASC",
        &[&object_uuid, &version, &copy_name],
        extent::from_row,
    )?;
    let size = entries.iter().map(|e| e.size).sum();
    Ok(FullLayout {
        object_uuid: object_uuid.to_string(),
        version,
        copy_name: copy_name.to_string(),
        extents: entries,
        size,
    })
}

/// All full layouts for every copy matching `predicate`, sorted ascending
/// by total size using an explicit in-place quicksort (§4.C) rather than
/// the standard library's merge-based `sort`.
pub fn full_layouts_sorted_by_size(handle: &Handle, predicate: Option<&str>) -> Result<Vec<FullLayout>> {
    let mut stmt = "SELECT DISTINCT object_uuid, version, copy_name FROM layout".to_string();
    if let Some(p) = predicate {
        stmt.push_str(" WHERE ");
        stmt.push_str(p);
    }
    let keys: Vec<(String, i64, String)> = handle.query(&stmt, &[], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    let mut layouts: Vec<FullLayout> = keys
        .into_iter()
        .map(|(uuid, version, name)| full_layout(handle, &uuid, version, &name))
        .collect::<Result<_>>()?;
    quicksort_by_size(&mut layouts);
    Ok(layouts)
}

fn quicksort_by_size(layouts: &mut [FullLayout]) {
    let len = layouts.len();
    if len < 2 {
        return;
    }
    quicksort_range(layouts, 0, len - 1);
}

fn quicksort_range(layouts: &mut [FullLayout], low: usize, high: usize) {
    if low >= high {
        return;
    }
    let pivot = partition(layouts, low, high);
    if pivot > 0 {
        quicksort_range(layouts, low, pivot - 1);
    }
    quicksort_range(layouts, pivot + 1, high);
}

fn partition(layouts: &mut [FullLayout], low: usize, high: usize) -> usize {
    let pivot_size = layouts[high].size;
    let mut i = low;
    for j in low..high {
        if layouts[j].size < pivot_size {
            layouts.swap(i, j);
            i += 1;
        }
    }
    layouts.swap(i, high);
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::extent::{Hash, State};
    use crate::store::Handle;
    use serde_json::json;

    fn opened() -> (tempfile::TempDir, Handle) {
        let dir = tempfile::tempdir().unwrap();
        let connect = format!("dbname={}", dir.path().join("t.db").display());
        Handle::bootstrap_schema(&connect).unwrap();
        (dir, Handle::open(&connect).unwrap())
    }

    fn sized_extent(uuid: &str, size: i64) -> Extent {
        Extent {
            uuid: uuid.to_string(),
            size,
            offset: 0,
            state: State::Sync,
            medium_family: "tape".to_string(),
            medium_name: "L1".to_string(),
            medium_library: "lib0".to_string(),
            address: "0x0".to_string(),
            hash: Hash::default(),
            info: json!({}),
            creation_time: 1,
        }
    }

    #[test]
    fn full_layout_orders_extents_and_sums_size() {
        let (_dir, mut handle) = opened();
        extent::insert(&mut handle, &sized_extent("e1", 100)).unwrap();
        extent::insert(&mut handle, &sized_extent("e2", 200)).unwrap();
        insert(
            &mut handle,
            &LayoutEntry {
                object_uuid: "u1".to_string(),
                version: 1,
                copy_name: "c1".to_string(),
                extent_uuid: "e2".to_string(),
                layout_index: 1,
            },
        )
        .unwrap();
        insert(
            &mut handle,
            &LayoutEntry {
                object_uuid: "u1".to_string(),
                version: 1,
                copy_name: "c1".to_string(),
                extent_uuid: "e1".to_string(),
                layout_index: 0,
            },
        )
        .unwrap();
        let full = full_layout(&handle, "u1", 1, "c1").unwrap();
        assert_eq!(full.size, 300);
        assert_eq!(full.extents[0].uuid, "e1");
        assert_eq!(full.extents[1].uuid, "e2");
    }

    #[test]
    fn quicksort_orders_ascending_by_size() {
        let mut layouts = vec![
            FullLayout { object_uuid: "a".into(), version: 1, copy_name: "c".into(), extents: vec![], size: 300 },
            FullLayout { object_uuid: "b".into(), version: 1, copy_name: "c".into(), extents: vec![], size: 100 },
            FullLayout { object_uuid: "c".into(), version: 1, copy_name: "c".into(), extents: vec![], size: 200 },
        ];
        quicksort_by_size(&mut layouts);
        assert_eq!(layouts.iter().map(|l| l.size).collect::<Vec<_>>(), vec![100, 200, 300]);
    }
}
