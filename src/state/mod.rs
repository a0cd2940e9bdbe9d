//! State management module
//! 
//! This module contains the application state that owns the question timer,
//! its observable snapshot and the history of finished questions.

pub mod app_state;
pub mod history;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use history::{QuestionOutcome, QuestionRecord};
pub use timer_state::{TimerEvent, TimerState};
