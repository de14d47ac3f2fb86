//! Reconnect policy.
//!
//! Pure functions, kept apart from the supervisor so the policy is easy to test.

use std::time::Duration;

/// Multiplier cap of the linear backoff.
const MAX_BACKOFF_STEPS: u32 = 3;

/// Delay before reconnect attempt `attempt` (1-based).
///
/// Grows linearly with the attempt number and stops growing at three times
/// `base`: with a 3 s base the delays are 3 s, 6 s, 9 s, 9 s, ...
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt.min(MAX_BACKOFF_STEPS)
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `failed_attempts` - Consecutive failures so far, including the one just observed
/// * `max_attempts` - The maximum number of reconnection attempts allowed
///
/// # Returns
///
/// `true` while the failures stay within the allowed number of retries
pub fn should_attempt_reconnect(failed_attempts: u32, max_attempts: u32) -> bool {
    failed_attempts <= max_attempts
}
