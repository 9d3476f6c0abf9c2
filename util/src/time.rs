//! General time utility functions

use chrono::Duration;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Build a duration from a number of seconds.
///
/// The value is rounded to the nearest nanosecond.
pub fn duration_from_seconds(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * NANOS_PER_SECOND as f64).round() as i64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seconds_conversion() {
        assert_eq!(duration_from_seconds(0.1), Duration::milliseconds(100));
        assert_eq!(duration_from_seconds(-2.5), Duration::milliseconds(-2500));
        assert_eq!(duration_to_seconds(Duration::milliseconds(1500)), Some(1.5));
        assert_eq!(duration_to_seconds(Duration::max_value()), None);
    }
}
