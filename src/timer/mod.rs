//! Countdown timer module
//!
//! This module contains the clock-free countdown state machine and the
//! tokio-driven timer built on top of it.

pub mod countdown;
pub mod countdown_timer;
pub mod error;

// Re-export main types
pub use countdown::{Countdown, Firing, TimerPhase};
pub use countdown_timer::{ExpiredCycle, Timer};
pub use error::{validate_duration, TimerError};
