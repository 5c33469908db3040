//! Timestamp and identifier helpers shared across entity codecs.

use ulid::Ulid;

/// Current unix-epoch seconds, used for `creation_time`/`access_time`/
/// `deprec_time` columns across entities.
pub fn now_epoch() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// New process-unique identifier for generated rows (log records, and any
/// entity whose natural key is not supplied by the caller).
pub fn new_id() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_epoch_is_positive_and_monotonic_enough() {
        let a = now_epoch();
        let b = now_epoch();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn new_id_is_unique_and_valid_ulid() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(Ulid::from_string(&a).is_ok());
    }
}
