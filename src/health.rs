//! Health engine (component F, §4.F): a bounded counter derived from a
//! resource's chronological log stream, plus the post-action log-append
//! routine every mutating operation reports through.

use crate::entities::log::{self, LogRecord, ResourceKind};
use crate::error::Result;
use crate::store::Handle;
use serde_json::{json, Value};

/// Scan the resource's log stream in chronological order and fold it into
/// a bounded counter (§4.F):
///
/// ```text
/// health = max_health
/// skip logs until the first errno != 0
/// thereafter: errno != 0 → health -= 1; errno == 0 → health += 1
/// clamp health into [0, max_health]
/// ```
///
/// Runs as a single read against the Store; holds no lock across the scan.
pub fn health(handle: &Handle, kind: ResourceKind, family: &str, name: &str, library: &str, max_health: i64) -> Result<i64> {
    let logs = log::for_resource(handle, kind, family, name, library)?;
    Ok(fold(&logs, max_health))
}

fn fold(logs: &[LogRecord], max_health: i64) -> i64 {
    let mut health = max_health;
    let mut seen_failure = false;
    for entry in logs {
        if !seen_failure {
            if entry.errno == 0 {
                continue;
            }
            seen_failure = true;
        }
        health += if entry.errno != 0 { -1 } else { 1 };
        health = health.clamp(0, max_health);
    }
    health
}

/// A skeleton describing whether and how an action's outcome should be
/// logged, supplied by the caller performing the action.
pub struct LogSkeleton {
    pub should_log: bool,
    pub cause: String,
    pub device: Option<(String, String, String)>,
    pub medium: Option<(String, String, String)>,
    pub message: Value,
}

impl LogSkeleton {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            should_log: true,
            cause: cause.into(),
            device: None,
            medium: None,
            message: json!({}),
        }
    }

    pub fn silent(cause: impl Into<String>) -> Self {
        Self {
            should_log: false,
            ..Self::new(cause)
        }
    }

    pub fn with_device(mut self, family: &str, name: &str, library: &str) -> Self {
        self.device = Some((family.to_string(), name.to_string(), library.to_string()));
        self
    }

    pub fn with_medium(mut self, family: &str, name: &str, library: &str) -> Self {
        self.medium = Some((family.to_string(), name.to_string(), library.to_string()));
        self
    }
}

/// Post-action emit routine (§4.F): persists a log row only when `skeleton`
/// says the action should be logged. If `rc != 0` and `action` differs from
/// `skeleton.cause`, the message is wrapped under a key named after
/// `action` to preserve provenance of which caller actually triggered the
/// failure, since a skeleton is often built ahead of time for a generic
/// cause (e.g. "load") but the failing step was a more specific one (e.g.
/// "mount").
pub fn emit_log(handle: &mut Handle, action: &str, rc: i64, skeleton: &LogSkeleton) -> Result<()> {
    if !skeleton.should_log {
        return Ok(());
    }
    let message = if rc != 0 && action != skeleton.cause {
        json!({ action: skeleton.message.clone() })
    } else {
        skeleton.message.clone()
    };
    let mut record = LogRecord::new(skeleton.cause.clone(), rc, message);
    if let Some((f, n, l)) = &skeleton.device {
        record = record.with_device(f, n, l);
    }
    if let Some((f, n, l)) = &skeleton.medium {
        record = record.with_medium(f, n, l);
    }
    log::insert(handle, &record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(errno: i64, ts: i64) -> LogRecord {
        LogRecord {
            id: format!("l{ts}"),
            device: None,
            medium: None,
            errno,
            cause: "load".to_string(),
            message: json!({}),
            ts,
        }
    }

    #[test]
    fn health_clamping_matches_literal_scenario() {
        // [ok, err, err, err, ok, err] with max_health=5 -> health=2 (§8).
        let logs = vec![
            entry(0, 1),
            entry(1, 2),
            entry(1, 3),
            entry(1, 4),
            entry(0, 5),
            entry(1, 6),
        ];
        assert_eq!(fold(&logs, 5), 2);
    }

    #[test]
    fn empty_log_stream_returns_max_health() {
        assert_eq!(fold(&[], 5), 5);
    }

    #[test]
    fn health_never_exceeds_max() {
        let logs = vec![entry(0, 1), entry(1, 2), entry(0, 3), entry(0, 4), entry(0, 5)];
        assert_eq!(fold(&logs, 3), 3);
    }

    #[test]
    fn leading_successes_before_first_failure_are_skipped() {
        let logs = vec![entry(0, 1), entry(0, 2), entry(0, 3)];
        assert_eq!(fold(&logs, 5), 5);
    }

    #[test]
    fn silent_skeleton_emits_nothing() {
        use crate::store::Handle;
        let dir = tempfile::tempdir().unwrap();
        let connect = format!("dbname={}", dir.path().join("t.db").display());
        Handle::bootstrap_schema(&connect).unwrap();
        let mut handle = Handle::open(&connect).unwrap();
        emit_log(&mut handle, "load", 0, &LogSkeleton::silent("load")).unwrap();
        let logs = log::for_resource(&handle, ResourceKind::Medium, "tape", "L1", "lib0").unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn mismatched_action_wraps_message_for_provenance() {
        use crate::store::Handle;
        let dir = tempfile::tempdir().unwrap();
        let connect = format!("dbname={}", dir.path().join("t.db").display());
        Handle::bootstrap_schema(&connect).unwrap();
        let mut handle = Handle::open(&connect).unwrap();
        let skeleton = LogSkeleton::new("load")
            .with_medium("tape", "L1", "lib0");
        emit_log(&mut handle, "mount", 1, &skeleton).unwrap();
        let logs = log::for_resource(&handle, ResourceKind::Medium, "tape", "L1", "lib0").unwrap();
        assert_eq!(logs[0].message, json!({"mount": {}}));
        assert_eq!(logs[0].cause, "load");
    }
}
