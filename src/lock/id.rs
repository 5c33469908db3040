//! Composite lock-id construction (§4.E).
//!
//! `id` is built as the colon-less `escape(key) [ "_" escape(library) ]`
//! form: colons would collide with the `(type, id)` pair's own separator
//! if a raw key ever contained one, so every component is escaped before
//! joining.

use crate::error::{DssError, Result};

/// Maximum length of a composite lock id (§8 invariant: `length(id) ≤
/// MAX_LOCK_ID_LEN`). Not specified numerically by the specification; this
/// crate fixes it at 256, generous for any natural key in the data model
/// (the longest is a medium's `family_name_library` triple) while still
/// catching pathological input.
pub const MAX_LOCK_ID_LEN: usize = 256;

/// Escape a single key component: `_` is the join separator between `key`
/// and `library`, so literal underscores are doubled to stay unambiguous.
fn escape_component(s: &str) -> String {
    s.replace('_', "__")
}

/// Build a composite lock id from a natural key and optional library.
/// Fails `InvalidData` if the result exceeds [`MAX_LOCK_ID_LEN`].
pub fn build(key: &str, library: Option<&str>) -> Result<String> {
    let mut id = escape_component(key);
    if let Some(lib) = library {
        id.push('_');
        id.push_str(&escape_component(lib));
    }
    if id.len() > MAX_LOCK_ID_LEN {
        return Err(DssError::invalid_data(format!(
            "lock id '{id}' exceeds MAX_LOCK_ID_LEN ({MAX_LOCK_ID_LEN})"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_key_and_library_with_underscore() {
        assert_eq!(build("L00001", Some("lib0")).unwrap(), "L00001_lib0");
    }

    #[test]
    fn key_only_has_no_trailing_separator() {
        assert_eq!(build("foo", None).unwrap(), "foo");
    }

    #[test]
    fn literal_underscores_are_escaped_before_joining() {
        let id = build("a_b", Some("c")).unwrap();
        assert_eq!(id, "a__b_c");
    }

    #[test]
    fn oversized_id_fails_invalid_data() {
        let long_key = "x".repeat(MAX_LOCK_ID_LEN + 1);
        let err = build(&long_key, None).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidData);
    }
}
