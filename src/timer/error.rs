//! Timer error types

use thiserror::Error;

/// Errors raised by [`Timer`](super::Timer) and [`Countdown`](super::Countdown)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("Invalid timer duration: {0}s (must be a positive number of seconds)")]
    InvalidDuration(u64),

    #[error("Timer schedule requires a running tokio runtime")]
    NoRuntime,
}

/// Reject durations that cannot produce a countdown
pub fn validate_duration(seconds: u64) -> Result<u64, TimerError> {
    if seconds == 0 {
        return Err(TimerError::InvalidDuration(seconds));
    }
    Ok(seconds)
}
