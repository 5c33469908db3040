//! Entity codecs (component C): one module per entity type, each owning
//! its row shape and the SQL fragments that move it to and from the Store.
//!
//! Grounded on the teacher's per-subsystem table owners (`core/db.rs`,
//! `plugins/health.rs`), generalized per §9's redesign note: a "capability
//! interface" (insert/update/select/delete/from_row) replaces the
//! `void*`-and-size-table pattern, with [`crate::error::ErrorKind::NotSupported`]
//! standing in for an absent operation instead of a null function pointer.

pub mod copy;
pub mod deprecated_object;
pub mod device;
pub mod extent;
pub mod layout;
pub mod log;
pub mod medium;
pub mod object;

/// Discriminates which table a CRUD-facade call targets (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Object,
    DeprecatedObject,
    Copy,
    Layout,
    Extent,
    Medium,
    Device,
}

/// A decoded batch of rows. Owns its storage; [`ResultSet::free`] is the
/// explicit, symmetric counterpart to the specification's "free result"
/// entry point (§3's lifecycle note) even though `Drop` already reclaims
/// everything — some callers want to release rows before the end of scope.
#[derive(Debug, Default)]
pub struct ResultSet<T> {
    rows: Vec<T>,
}

impl<T> ResultSet<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    /// Explicit release. A no-op beyond dropping `self`'s storage; exists
    /// so callers mirroring the specification's C-shaped API have a single
    /// symmetric call instead of relying on scope exit.
    pub fn free(self) {}
}

impl<T> IntoIterator for ResultSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_set_tracks_length_and_iterates() {
        let rs = ResultSet::new(vec![1, 2, 3]);
        assert_eq!(rs.len(), 3);
        assert_eq!(rs.iter().sum::<i32>(), 6);
        let collected: Vec<i32> = rs.into_iter().collect();
        assert_eq!(collected, vec![1, 2, 3]);
    }
}
