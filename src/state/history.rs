//! Finished question cycles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::ExpiredCycle;

use super::TimerState;

/// How a question cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionOutcome {
    /// The countdown ran out
    Expired,
    /// The owner reset the timer before it ran out
    Reset,
}

/// Timing record of one finished question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub duration_seconds: u64,
    pub time_spent_seconds: u64,
    pub question_time_seconds: u64,
    pub outcome: QuestionOutcome,
    pub finished_at: DateTime<Utc>,
}

impl QuestionRecord {
    /// Build a record from the timer state at the end of a cycle
    pub fn finished(state: &TimerState, outcome: QuestionOutcome) -> Self {
        Self {
            duration_seconds: state.duration_seconds,
            time_spent_seconds: state.time_spent_seconds,
            question_time_seconds: state.question_time_seconds,
            outcome,
            finished_at: Utc::now(),
        }
    }

    /// Build a record for a cycle that ran out of time
    pub fn expired(cycle: &ExpiredCycle) -> Self {
        Self {
            duration_seconds: cycle.duration_seconds,
            time_spent_seconds: cycle.duration_seconds,
            question_time_seconds: cycle.question_time_seconds,
            outcome: QuestionOutcome::Expired,
            finished_at: cycle.expired_at,
        }
    }
}
