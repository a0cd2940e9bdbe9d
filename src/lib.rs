//! Quiz Timer - A pausable one-second countdown for time-limited questions
//! 
//! This library provides the countdown [`Timer`] with tick and timeout
//! callbacks, plus the state, background task and HTTP API used by the
//! `quiz-timer` server to host one question timer.

pub mod config;
pub mod timer;
pub mod state;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use timer::{Timer, TimerError, TimerPhase};
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
