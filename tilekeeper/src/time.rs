//! Time-related utility functions.
//!
//! Dirty records carry wall-clock timestamps as milliseconds since the Unix
//! epoch, with `0` reserved for "never rendered / unknown age". These helpers
//! convert filesystem and clock times into that representation.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    system_time_to_millis(SystemTime::now())
}

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
///
/// Times before the epoch saturate to `0`.
///
/// # Example
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use tilekeeper::time::system_time_to_millis;
///
/// let t = UNIX_EPOCH + Duration::from_millis(1_500);
/// assert_eq!(system_time_to_millis(t), 1_500);
/// ```
pub fn system_time_to_millis(system_time: SystemTime) -> u64 {
    system_time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn system_time_to_millis_epoch() {
        assert_eq!(system_time_to_millis(UNIX_EPOCH), 0);
    }

    #[test]
    fn system_time_to_millis_before_epoch_saturates() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(system_time_to_millis(before), 0);
    }

    #[test]
    fn now_millis_is_recent() {
        let a = now_millis();
        let b = system_time_to_millis(SystemTime::now());
        assert!(a > 1_600_000_000_000, "clock should be past 2020");
        assert!(b >= a);
        assert!(b - a < 1_000);
    }
}
