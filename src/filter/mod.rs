//! JSON filter compilation (component B, §4.B).
//!
//! Callers build a filter as `serde_json::Value` using the `DSS::<NAMESPACE>::<field>`
//! keys from §6.2 and the `$`-prefixed operators from §4.B, then call
//! [`compile`] to obtain a predicate string for a `WHERE` clause.

mod compiler;
pub mod fields;
#[cfg(test)]
mod interpreter;
mod visitor;

pub use compiler::compile;
pub use visitor::FilterVisitor;
