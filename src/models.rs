//! Supported-model registry (component I) — a process-wide, immutable,
//! case-insensitive set of configured tape model names.
//!
//! Grounded on the teacher's scoped-singleton pattern in `core/broker.rs`
//! (`OnceLock<Mutex<...>>` for `db_lock_map`/`broker_read_cache`), adapted
//! to a one-shot initializer per §4.I and §9 ("represent as scoped
//! singletons... if a shared set is unavoidable, guard it with a one-shot
//! initializer").

use crate::error::{DssError, ErrorKind, Result};
use std::sync::OnceLock;

static SUPPORTED_MODELS: OnceLock<Vec<String>> = OnceLock::new();

/// Parse a comma-separated list and install it as the process-wide
/// supported-model set. A second call returns `AlreadyInitialized` and is
/// a no-op — the existing set is left untouched.
pub fn init(comma_separated: &str) -> Result<()> {
    let models: Vec<String> = comma_separated
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    SUPPORTED_MODELS
        .set(models)
        .map_err(|_| DssError::new(ErrorKind::AlreadyInitialized, "supported-model set already initialized"))
}

/// Case-insensitive membership test. Returns `false` if [`init`] has not
/// been called yet (an uninitialized registry supports nothing).
pub fn check(model: &str) -> bool {
    SUPPORTED_MODELS
        .get()
        .map(|models| models.iter().any(|m| m.eq_ignore_ascii_case(model)))
        .unwrap_or(false)
}

/// The content every test in this binary uses to populate the registry.
/// `SUPPORTED_MODELS` is a process-wide `OnceLock`, and `cargo test` runs
/// unit tests from every module in one binary in parallel, so whichever
/// test calls [`init`] first wins and every other caller's `init` becomes
/// a no-op. Standardizing on one string here means that race is harmless:
/// no matter which test wins it, the installed content is the same.
#[cfg(test)]
pub(crate) const TEST_MODELS: &str = "LTO7,LTO8,LTO9";

/// Install [`TEST_MODELS`] if nobody has initialized the registry yet;
/// otherwise a documented no-op. Call this instead of [`init`] directly
/// from any test that needs the registry populated.
#[cfg(test)]
pub(crate) fn ensure_test_models() {
    let _ = init(TEST_MODELS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_one_shot_and_check_is_case_insensitive() {
        // Either we're the first caller in this binary to initialize the
        // registry, or another test already has — both are fine since
        // every caller in the binary agrees on `TEST_MODELS`.
        match init(TEST_MODELS) {
            Ok(()) => {}
            Err(e) => assert_eq!(e.kind, ErrorKind::AlreadyInitialized),
        }
        assert!(check("lto8"));
        assert!(check("LTO9"));
        assert!(!check("LTO6"));

        // A second call with different content is always rejected, since
        // the registry has been initialized by someone by this point.
        let second = init("LTO6-only");
        assert_eq!(second.unwrap_err().kind, ErrorKind::AlreadyInitialized);
        assert!(!check("LTO6-only"));
    }
}
