//! The Store gateway (component A): connection lifecycle, statement
//! execution, the transaction envelope, error-class mapping, and
//! identifier/literal escaping. Everything else in this crate reaches the
//! backend exclusively through [`Handle`].

pub mod errmap;
pub mod handle;
pub mod schema;

pub use handle::{escape_identifier, escape_literal, Handle, NoticeSink};
pub use schema::SCHEMA_VERSION;
