//! Clock-free countdown state machine
//!
//! [`Countdown`] holds every rule of the question timer (decrement, pause,
//! expiry, duplicate-start protection) without touching a clock. The
//! [`Timer`](super::Timer) drives it from a one-second tokio schedule, and
//! tests drive it by calling [`Countdown::fire`] directly.

use serde::{Deserialize, Serialize};

use super::error::{validate_duration, TimerError};

/// Observable lifecycle phase of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Expired,
}

impl TimerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
            TimerPhase::Expired => "expired",
        }
    }
}

/// Outcome of one scheduled firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    /// The firing belongs to a schedule that was stopped or replaced
    Stale,
    /// The timer is paused; nothing changed
    Paused,
    /// One second was counted down; carries the new remaining time
    Tick(u64),
    /// The countdown reached zero and the schedule is finished
    Expired,
}

/// Schedule ownership. Each `start` hands out a fresh generation so firings
/// from a cancelled schedule can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    Idle,
    Running(u64),
    Expired,
}

/// Countdown state: duration, remaining seconds, pause flag and schedule
#[derive(Debug, Clone)]
pub struct Countdown {
    duration: u64,
    remaining: u64,
    paused: bool,
    schedule: Schedule,
    next_generation: u64,
}

impl Countdown {
    /// Create an idle countdown of `duration` seconds
    pub fn new(duration: u64) -> Result<Self, TimerError> {
        let duration = validate_duration(duration)?;
        Ok(Self {
            duration,
            remaining: duration,
            paused: false,
            schedule: Schedule::Idle,
            next_generation: 0,
        })
    }

    /// Claim the schedule.
    ///
    /// Returns the generation the new schedule must present on every firing,
    /// or `None` when a schedule is already running or nothing is left to
    /// count down.
    pub fn start(&mut self) -> Option<u64> {
        match self.schedule {
            Schedule::Running(_) | Schedule::Expired => None,
            Schedule::Idle if self.remaining == 0 => None,
            Schedule::Idle => {
                let generation = self.next_generation;
                self.next_generation = self.next_generation.wrapping_add(1);
                self.schedule = Schedule::Running(generation);
                Some(generation)
            }
        }
    }

    /// Release the schedule, keeping the remaining time.
    ///
    /// Returns `true` if a running schedule was cancelled.
    pub fn stop(&mut self) -> bool {
        let was_running = matches!(self.schedule, Schedule::Running(_));
        self.schedule = Schedule::Idle;
        was_running
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stop and restore a full countdown of `duration` seconds.
    ///
    /// On an invalid duration the countdown is left untouched.
    pub fn reset(&mut self, duration: u64) -> Result<(), TimerError> {
        let duration = validate_duration(duration)?;
        self.stop();
        self.duration = duration;
        self.remaining = duration;
        self.paused = false;
        Ok(())
    }

    /// Apply one firing of the schedule identified by `generation`
    pub fn fire(&mut self, generation: u64) -> Firing {
        if self.schedule != Schedule::Running(generation) {
            return Firing::Stale;
        }
        if self.paused {
            return Firing::Paused;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.schedule = Schedule::Expired;
            Firing::Expired
        } else {
            Firing::Tick(self.remaining)
        }
    }

    pub fn phase(&self) -> TimerPhase {
        match self.schedule {
            Schedule::Idle => TimerPhase::Idle,
            Schedule::Running(_) if self.paused => TimerPhase::Paused,
            Schedule::Running(_) => TimerPhase::Running,
            Schedule::Expired => TimerPhase::Expired,
        }
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Seconds counted down so far in this cycle
    pub fn spent(&self) -> u64 {
        self.duration - self.remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        matches!(self.schedule, Schedule::Running(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(duration: u64) -> (Countdown, u64) {
        let mut countdown = Countdown::new(duration).unwrap();
        let generation = countdown.start().unwrap();
        (countdown, generation)
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert_eq!(Countdown::new(0).unwrap_err(), TimerError::InvalidDuration(0));
    }

    #[test]
    fn counts_down_to_expiry() {
        for duration in [1, 2, 7, 60] {
            let (mut countdown, generation) = running(duration);
            let firings: Vec<Firing> = (0..duration).map(|_| countdown.fire(generation)).collect();

            let expired = firings.iter().filter(|f| **f == Firing::Expired).count();
            assert_eq!(expired, 1);
            assert_eq!(firings.last(), Some(&Firing::Expired));
            assert_eq!(countdown.remaining(), 0);
            assert_eq!(countdown.spent(), duration);
            assert_eq!(countdown.phase(), TimerPhase::Expired);

            // the finished schedule does nothing afterwards
            assert_eq!(countdown.fire(generation), Firing::Stale);
            assert_eq!(countdown.remaining(), 0);
        }
    }

    #[test]
    fn ticks_report_new_remaining_time() {
        let (mut countdown, generation) = running(3);
        assert_eq!(countdown.fire(generation), Firing::Tick(2));
        assert_eq!(countdown.fire(generation), Firing::Tick(1));
        assert_eq!(countdown.fire(generation), Firing::Expired);
    }

    #[test]
    fn paused_firings_never_decrement() {
        let (mut countdown, generation) = running(10);
        countdown.fire(generation);
        countdown.pause();
        assert_eq!(countdown.phase(), TimerPhase::Paused);

        for _ in 0..25 {
            assert_eq!(countdown.fire(generation), Firing::Paused);
        }
        assert_eq!(countdown.remaining(), 9);

        countdown.resume();
        assert_eq!(countdown.fire(generation), Firing::Tick(8));
        // n = 27 firings, k = 25 paused
        assert_eq!(countdown.remaining(), 10 - (27 - 25));
    }

    #[test]
    fn duplicate_start_keeps_one_schedule() {
        let (mut countdown, generation) = running(3);
        assert_eq!(countdown.start(), None);
        assert_eq!(countdown.fire(generation), Firing::Tick(2));
    }

    #[test]
    fn stop_invalidates_old_schedule() {
        let (mut countdown, old) = running(5);
        countdown.fire(old);
        assert!(countdown.stop());
        assert!(!countdown.stop());
        assert_eq!(countdown.phase(), TimerPhase::Idle);

        assert_eq!(countdown.fire(old), Firing::Stale);
        assert_eq!(countdown.remaining(), 4);

        let new = countdown.start().unwrap();
        assert_ne!(old, new);
        assert_eq!(countdown.fire(old), Firing::Stale);
        assert_eq!(countdown.fire(new), Firing::Tick(3));
    }

    #[test]
    fn reset_restores_from_every_phase() {
        let (mut countdown, generation) = running(2);
        countdown.reset(4).unwrap();
        assert_eq!((countdown.remaining(), countdown.phase()), (4, TimerPhase::Idle));

        let generation2 = countdown.start().unwrap();
        countdown.pause();
        countdown.reset(3).unwrap();
        assert_eq!(countdown.remaining(), 3);
        assert!(!countdown.is_paused());
        assert_eq!(countdown.fire(generation2), Firing::Stale);
        assert_eq!(countdown.fire(generation), Firing::Stale);

        let generation3 = countdown.start().unwrap();
        for _ in 0..3 {
            countdown.fire(generation3);
        }
        assert_eq!(countdown.phase(), TimerPhase::Expired);
        countdown.reset(3).unwrap();
        assert_eq!(countdown.remaining(), 3);
        assert_eq!(countdown.phase(), TimerPhase::Idle);
    }

    #[test]
    fn invalid_reset_leaves_state_alone() {
        let (mut countdown, generation) = running(5);
        countdown.fire(generation);
        assert_eq!(countdown.reset(0), Err(TimerError::InvalidDuration(0)));
        assert_eq!(countdown.remaining(), 4);
        assert_eq!(countdown.phase(), TimerPhase::Running);
    }

    #[test]
    fn expired_countdown_cannot_restart_without_reset() {
        let (mut countdown, generation) = running(1);
        assert_eq!(countdown.fire(generation), Firing::Expired);
        assert_eq!(countdown.start(), None);

        // stop from expired goes idle but there is still nothing to count
        countdown.stop();
        assert_eq!(countdown.phase(), TimerPhase::Idle);
        assert_eq!(countdown.start(), None);
    }
}
