//! Object resolver (component G, §4.G): locate an object by
//! `(oid?, uuid?, version?)` across the alive and deprecated tables.

use crate::entities::{deprecated_object, object};
use crate::error::{DssError, Result};
use crate::store::{escape_literal, Handle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Alive,
    Deprecated,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Alive(object::Object),
    Deprecated(deprecated_object::DeprecatedObject),
}

/// Resolve an object by `(oid, uuid, version)`. At least one of
/// `oid`/`uuid` must be non-`None`. See §4.G for the full tie-break rules.
pub fn resolve(handle: &Handle, oid: Option<&str>, uuid: Option<&str>, version: Option<i64>, scope: Scope) -> Result<Resolved> {
    if oid.is_none() && uuid.is_none() {
        return Err(DssError::invalid_data("resolve requires at least one of oid or uuid"));
    }
    let predicate = build_predicate(oid, uuid, version);

    if scope != Scope::Deprecated {
        let alive = object::select(handle, predicate.as_deref(), None)?;
        // alive is unique by oid; at most one row can match.
        if let Some(row) = alive.into_iter().next() {
            return Ok(Resolved::Alive(row));
        }
        if scope == Scope::Alive {
            return Err(DssError::not_found("no alive object matches"));
        }
    }

    let candidates = deprecated_object::select(handle, predicate.as_deref(), None)?;
    pick_deprecated(candidates, uuid, version)
}

fn build_predicate(oid: Option<&str>, uuid: Option<&str>, version: Option<i64>) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(oid) = oid {
        clauses.push(format!("oid = {}", escape_literal(Some(oid))));
    }
    if let Some(uuid) = uuid {
        clauses.push(format!("uuid = {}", escape_literal(Some(uuid))));
    }
    if let Some(version) = version {
        clauses.push(format!("version = {version}"));
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn pick_deprecated(
    candidates: Vec<deprecated_object::DeprecatedObject>,
    uuid: Option<&str>,
    version: Option<i64>,
) -> Result<Resolved> {
    if candidates.is_empty() {
        return Err(DssError::not_found("no object matches"));
    }
    if uuid.is_none() {
        let distinct_uuids: std::collections::HashSet<&str> =
            candidates.iter().map(|c| c.uuid.as_str()).collect();
        if distinct_uuids.len() > 1 {
            return Err(DssError::ambiguous("multiple deprecated uuids match; specify uuid"));
        }
    }
    if version.is_some() {
        // predicate already pinned the version; exactly one row can exist
        // per (uuid, version) primary key.
        return Ok(Resolved::Deprecated(candidates.into_iter().next().unwrap()));
    }
    let best = candidates
        .into_iter()
        .max_by_key(|c| c.version)
        .expect("candidates is non-empty");
    Ok(Resolved::Deprecated(best))
}
