//! DSS: a relational metadata catalog for a hierarchical storage manager.
//!
//! A DSS deployment tracks the objects an HSM stores, the copies and
//! extents those objects are laid out across, the media and devices that
//! hold the extents, and the distributed locks and health counters that
//! keep concurrent daemons from stepping on each other. This crate is the
//! catalog half of that system: a SQLite-backed store, a small filter
//! language for querying it, and the entity- and lock-level operations
//! that sit on top.
//!
//! # Architecture
//!
//! - [`store`]: connection lifecycle, statement execution, the manual
//!   `BEGIN`/`COMMIT` transaction envelope, and SQLite error-class mapping.
//!   Every other module reaches the backend exclusively through
//!   [`store::Handle`].
//! - [`filter`]: compiles a `serde_json::Value` filter expression (the
//!   `DSS::<NAMESPACE>::<field>` / `$AND`/`$OR`/`$NOR`/comparator grammar)
//!   into a SQL predicate fragment.
//! - [`entities`]: one module per table (`object`, `deprecated_object`,
//!   `copy`, `layout`, `extent`, `medium`, `device`, `log`), each owning
//!   its row shape and insert/update/select/delete codec.
//! - [`crud`]: the generic facade other crates call instead of reaching
//!   into `entities::*` directly — batch get/insert/update/delete plus the
//!   dedicated rename/deprecate/undeprecate operations.
//! - [`lock`]: the distributed lock registry keyed by `(type, id)`.
//! - [`health`]: the bounded health counter folded from a resource's log
//!   stream, and the post-action log-append routine.
//! - [`resolver`]: locates an object by `(oid?, uuid?, version?)` across
//!   the alive and deprecated tables.
//! - [`models`]: the process-wide supported-tape-model registry.
//! - [`config`]: TOML/env configuration loading.
//! - [`error`]: the `Result<T, DssError>` surface every fallible operation
//!   in this crate returns.

pub mod config;
pub mod crud;
pub mod entities;
pub mod error;
pub mod filter;
pub mod health;
pub mod lock;
pub mod models;
pub mod resolver;
pub mod store;
pub mod time;

pub use config::Config;
pub use error::{DssError, ErrorKind, Result};
pub use store::Handle;
