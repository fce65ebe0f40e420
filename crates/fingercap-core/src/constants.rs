//! Default values and limits for capture sessions.
//!
//! Every tunable in [`CaptureSettings`](crate::CaptureSettings) has its
//! default and its accepted range defined here, so the settings loader, the
//! CLI and the tests agree on the same numbers.
//!
//! # Usage
//!
//! ```
//! use fingercap_core::constants::*;
//!
//! fn threshold_in_range(q: u8) -> bool {
//!     (MIN_QUALITY_THRESHOLD..=MAX_QUALITY_THRESHOLD).contains(&q)
//! }
//!
//! assert!(threshold_in_range(DEFAULT_QUALITY_THRESHOLD));
//! ```

// ============================================================================
// Quality
// ============================================================================

/// Highest quality score a scanner can report.
pub const MAX_QUALITY_SCORE: u8 = 100;

/// Default quality threshold for a sample to count as a good scan.
///
/// Samples scoring at or above this value mark the finger as `GoodScan`.
/// The same value is passed to the scanner as the continuous-capture floor.
pub const DEFAULT_QUALITY_THRESHOLD: u8 = 60;

/// Lowest quality threshold an operator may configure.
pub const MIN_QUALITY_THRESHOLD: u8 = 40;

/// Highest quality threshold an operator may configure.
pub const MAX_QUALITY_THRESHOLD: u8 = 99;

// ============================================================================
// Timing
// ============================================================================

/// Default continuous-capture timeout in seconds.
///
/// When no frame reaches the quality floor within this window the scanner
/// gives up and the sequencer falls back to a forced single-shot capture.
pub const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 3;

/// Shortest continuous-capture timeout in seconds.
pub const MIN_CAPTURE_TIMEOUT_SECS: u64 = 1;

/// Longest continuous-capture timeout in seconds.
pub const MAX_CAPTURE_TIMEOUT_SECS: u64 = 10;

/// Delay before the cursor auto-advances after a good scan (milliseconds).
pub const DEFAULT_NUDGE_DELAY_MS: u64 = 500;

/// Length of the haptic pulse emitted when a scan completes (milliseconds).
pub const HAPTIC_PULSE_MS: u64 = 100;

// ============================================================================
// Hardware
// ============================================================================

/// Last scanner hardware revision without forced single-shot capture.
///
/// Revisions up to and including this value cannot force a capture after a
/// continuous-capture timeout; the finger is marked as a bad scan instead.
pub const LAST_REVISION_WITHOUT_FORCE_CAPTURE: u16 = 4;

/// Default number of full reconnection passes before giving up.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 1;

/// Upper bound on reconnection passes accepted from configuration.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

// ============================================================================
// Submission
// ============================================================================

/// Minimum number of required fingers with an accepted scan for submission.
pub const MIN_REQUIRED_ACCEPTED: usize = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_within_bounds() {
        assert!(DEFAULT_QUALITY_THRESHOLD >= MIN_QUALITY_THRESHOLD);
        assert!(DEFAULT_QUALITY_THRESHOLD <= MAX_QUALITY_THRESHOLD);
        assert!(MAX_QUALITY_THRESHOLD < MAX_QUALITY_SCORE);
    }

    #[test]
    fn test_default_timeout_within_bounds() {
        assert!(DEFAULT_CAPTURE_TIMEOUT_SECS >= MIN_CAPTURE_TIMEOUT_SECS);
        assert!(DEFAULT_CAPTURE_TIMEOUT_SECS <= MAX_CAPTURE_TIMEOUT_SECS);
    }

    #[test]
    fn test_reconnect_attempts_bounds() {
        assert!(DEFAULT_RECONNECT_ATTEMPTS >= 1);
        assert!(DEFAULT_RECONNECT_ATTEMPTS <= MAX_RECONNECT_ATTEMPTS);
    }
}
