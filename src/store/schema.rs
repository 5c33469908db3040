//! Canonical SQL schema definitions for the DSS catalog.
//!
//! Each entity type owns one `CREATE TABLE IF NOT EXISTS` string here,
//! following the teacher's convention of centralizing DDL as named
//! constants rather than scattering `CREATE TABLE` calls through the
//! codecs that use the tables.

pub const SCHEMA_VERSION: &str = "1.0.0";

pub const SCHEMA_INFO: &str = "
    CREATE TABLE IF NOT EXISTS schema_info (
        version TEXT PRIMARY KEY
    )
";

pub const OBJECT: &str = "
    CREATE TABLE IF NOT EXISTS object (
        oid TEXT PRIMARY KEY,
        uuid TEXT NOT NULL,
        version INTEGER NOT NULL,
        user_md TEXT NOT NULL DEFAULT '{}',
        grouping_label TEXT,
        size INTEGER NOT NULL DEFAULT 0,
        creation_time INTEGER NOT NULL,
        UNIQUE(uuid, version)
    )
";

pub const DEPRECATED_OBJECT: &str = "
    CREATE TABLE IF NOT EXISTS deprecated_object (
        uuid TEXT NOT NULL,
        version INTEGER NOT NULL,
        oid TEXT NOT NULL,
        user_md TEXT NOT NULL DEFAULT '{}',
        grouping_label TEXT,
        size INTEGER NOT NULL DEFAULT 0,
        creation_time INTEGER NOT NULL,
        deprec_time INTEGER NOT NULL,
        PRIMARY KEY (uuid, version)
    )
";

pub const COPY: &str = "
    CREATE TABLE IF NOT EXISTS copy (
        object_uuid TEXT NOT NULL,
        version INTEGER NOT NULL,
        copy_name TEXT NOT NULL,
        copy_status TEXT NOT NULL,
        creation_time INTEGER NOT NULL,
        access_time INTEGER NOT NULL,
        layout_info TEXT,
        PRIMARY KEY (object_uuid, version, copy_name)
    )
";

pub const LAYOUT: &str = "
    CREATE TABLE IF NOT EXISTS layout (
        object_uuid TEXT NOT NULL,
        version INTEGER NOT NULL,
        copy_name TEXT NOT NULL,
        extent_uuid TEXT NOT NULL,
        layout_index INTEGER NOT NULL,
        PRIMARY KEY (object_uuid, version, copy_name, extent_uuid)
    )
";

pub const LAYOUT_INDEX_COPY: &str =
    "CREATE INDEX IF NOT EXISTS idx_layout_copy ON layout(object_uuid, version, copy_name)";

pub const EXTENT: &str = "
    CREATE TABLE IF NOT EXISTS extent (
        uuid TEXT PRIMARY KEY,
        size INTEGER NOT NULL,
        offset_bytes INTEGER NOT NULL,
        state TEXT NOT NULL,
        medium_family TEXT NOT NULL,
        medium_name TEXT NOT NULL,
        medium_library TEXT NOT NULL,
        address TEXT NOT NULL,
        hash TEXT,
        info TEXT NOT NULL DEFAULT '{}',
        creation_time INTEGER NOT NULL
    )
";

pub const MEDIUM: &str = "
    CREATE TABLE IF NOT EXISTS medium (
        family TEXT NOT NULL,
        name TEXT NOT NULL,
        library TEXT NOT NULL,
        model TEXT,
        admin_status TEXT NOT NULL,
        fs_type TEXT,
        fs_status TEXT,
        fs_label TEXT,
        address_type TEXT,
        put_access INTEGER NOT NULL DEFAULT 1,
        get_access INTEGER NOT NULL DEFAULT 1,
        delete_access INTEGER NOT NULL DEFAULT 1,
        nb_obj INTEGER NOT NULL DEFAULT 0,
        logc_spc_used INTEGER NOT NULL DEFAULT 0,
        phys_spc_used INTEGER NOT NULL DEFAULT 0,
        phys_spc_free INTEGER NOT NULL DEFAULT 0,
        nb_load INTEGER NOT NULL DEFAULT 0,
        nb_errors INTEGER NOT NULL DEFAULT 0,
        last_load INTEGER NOT NULL DEFAULT 0,
        tags TEXT NOT NULL DEFAULT '[]',
        groupings TEXT NOT NULL DEFAULT '[]',
        PRIMARY KEY (family, name, library)
    )
";

pub const DEVICE: &str = "
    CREATE TABLE IF NOT EXISTS device (
        family TEXT NOT NULL,
        name TEXT NOT NULL,
        library TEXT NOT NULL,
        model TEXT,
        host TEXT NOT NULL,
        path TEXT NOT NULL,
        admin_status TEXT NOT NULL,
        PRIMARY KEY (family, name, library)
    )
";

pub const LOCK: &str = "
    CREATE TABLE IF NOT EXISTS lock (
        lock_type TEXT NOT NULL,
        lock_id TEXT NOT NULL,
        hostname TEXT,
        owner INTEGER,
        ts INTEGER NOT NULL,
        last_locate INTEGER,
        is_weak INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (lock_type, lock_id)
    )
";

pub const LOG: &str = "
    CREATE TABLE IF NOT EXISTS log (
        id TEXT PRIMARY KEY,
        device_family TEXT,
        device_name TEXT,
        device_library TEXT,
        medium_family TEXT,
        medium_name TEXT,
        medium_library TEXT,
        errno INTEGER NOT NULL,
        cause TEXT NOT NULL,
        message TEXT NOT NULL DEFAULT '{}',
        ts INTEGER NOT NULL
    )
";

pub const LOG_INDEX_MEDIUM: &str =
    "CREATE INDEX IF NOT EXISTS idx_log_medium ON log(medium_family, medium_name, medium_library, ts)";
pub const LOG_INDEX_DEVICE: &str =
    "CREATE INDEX IF NOT EXISTS idx_log_device ON log(device_family, device_name, device_library, ts)";

/// All DDL statements, in dependency order. Used by [`crate::store::bootstrap_schema`].
pub const ALL: &[&str] = &[
    SCHEMA_INFO,
    OBJECT,
    DEPRECATED_OBJECT,
    COPY,
    LAYOUT,
    LAYOUT_INDEX_COPY,
    EXTENT,
    MEDIUM,
    DEVICE,
    LOCK,
    LOG,
    LOG_INDEX_MEDIUM,
    LOG_INDEX_DEVICE,
];
