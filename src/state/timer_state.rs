//! Timer state snapshot and timer events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{ExpiredCycle, Timer, TimerPhase};

/// Point-in-time copy of a question timer, as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: TimerPhase,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
    pub time_spent_seconds: u64,
    /// Wall-clock seconds since the last start or reset
    pub question_time_seconds: u64,
    pub paused: bool,
    pub started_at: DateTime<Utc>,
}

impl TimerState {
    /// Capture the current state of a timer
    pub fn capture(timer: &Timer) -> Self {
        let countdown = timer.countdown();
        Self {
            phase: countdown.phase(),
            duration_seconds: countdown.duration(),
            remaining_seconds: countdown.remaining(),
            time_spent_seconds: countdown.spent(),
            question_time_seconds: timer.question_time(),
            paused: countdown.is_paused(),
            started_at: timer.started_at(),
        }
    }

    /// Check if the timer is counting down
    pub fn is_active(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Paused)
    }

    /// Whether any time was counted in the current cycle
    pub fn has_progress(&self) -> bool {
        self.time_spent_seconds > 0
    }
}

/// Notifications emitted from the timer callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TimerEvent {
    Tick { remaining_seconds: u64 },
    /// Timing captured by the firing that ran the countdown out
    Expired(ExpiredCycle),
}
