//! Public field-name → internal column mapping (§6.2, §4.B).
//!
//! The filter compiler never lets a caller splice an arbitrary column name
//! into a query; every leaf field name is looked up here first, and an
//! unrecognized name fails `InvalidField`.

use std::collections::HashMap;
use std::sync::LazyLock;

static FIELD_MAP: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // DSS::DEV
        ("DSS::DEV::host", "host"),
        ("DSS::DEV::family", "family"),
        ("DSS::DEV::adm_status", "admin_status"),
        ("DSS::DEV::id", "name"),
        ("DSS::DEV::library", "library"),
        // DSS::MDA
        ("DSS::MDA::family", "family"),
        ("DSS::MDA::id", "name"),
        ("DSS::MDA::library", "library"),
        ("DSS::MDA::adm_status", "admin_status"),
        // DSS::OBJ
        ("DSS::OBJ::oid", "oid"),
        ("DSS::OBJ::uuid", "uuid"),
        ("DSS::OBJ::version", "version"),
        // DSS::LYT
        ("DSS::LYT::extent_uuid", "extent_uuid"),
        ("DSS::LYT::copy_name", "copy_name"),
        // DSS::EXT
        ("DSS::EXT::medium_family", "medium_family"),
        ("DSS::EXT::medium_id", "medium_name"),
        ("DSS::EXT::medium_library", "medium_library"),
        ("DSS::EXT::state", "state"),
        // DSS::COPY
        ("DSS::COPY::object_uuid", "object_uuid"),
        ("DSS::COPY::version", "version"),
        ("DSS::COPY::copy_name", "copy_name"),
        // DSS::LOG (start/end both bound to the `ts` column; comparison
        // operator, not field name, determines range direction)
        ("DSS::LOG::family", "device_family"),
        ("DSS::LOG::device", "device_name"),
        ("DSS::LOG::medium", "medium_name"),
        ("DSS::LOG::errno", "errno"),
        ("DSS::LOG::cause", "cause"),
        ("DSS::LOG::start", "ts"),
        ("DSS::LOG::end", "ts"),
    ])
});

/// Resolve a public field name to its internal column name, or `None` if
/// unrecognized (caller maps this to `InvalidField`).
pub fn resolve(public_name: &str) -> Option<&'static str> {
    FIELD_MAP.get(public_name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_field() {
        assert_eq!(resolve("DSS::OBJ::oid"), Some("oid"));
    }

    #[test]
    fn unknown_field_is_none() {
        assert_eq!(resolve("DSS::OBJ::nonexistent"), None);
    }

    #[test]
    fn log_start_and_end_share_the_ts_column() {
        assert_eq!(resolve("DSS::LOG::start"), Some("ts"));
        assert_eq!(resolve("DSS::LOG::end"), Some("ts"));
    }
}
