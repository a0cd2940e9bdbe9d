//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::timer::{validate_duration, Timer, TimerError, TimerPhase};
use super::{QuestionOutcome, QuestionRecord, TimerEvent, TimerState};

/// Main application state that owns the question timer and its history
#[derive(Debug)]
pub struct AppState {
    /// Timer bounding the current question
    pub timer: Timer,
    /// Finished question cycles, oldest first
    pub history: Arc<Mutex<Vec<QuestionRecord>>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel fed by the timer callbacks
    pub timer_event_tx: broadcast::Sender<TimerEvent>,
    /// Channel for timer updates
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Keep the receiver alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<TimerState>,
}

impl AppState {
    /// Create a new AppState with an idle timer of `duration_seconds`
    pub fn new(port: u16, host: String, duration_seconds: u64) -> Result<Self, TimerError> {
        let (timer_event_tx, _) = broadcast::channel(100);

        let tick_tx = timer_event_tx.clone();
        let timeout_tx = timer_event_tx.clone();
        let timer = Timer::new(duration_seconds)?
            .on_tick(move |remaining_seconds| {
                // no subscribers is fine, the snapshot is refreshed on demand
                let _ = tick_tx.send(TimerEvent::Tick { remaining_seconds });
            })
            .on_expired(move |cycle| {
                if let Err(e) = timeout_tx.send(TimerEvent::Expired(*cycle)) {
                    warn!("Failed to send timer expiry notification: {}", e);
                }
            });

        let (timer_update_tx, timer_update_rx) = watch::channel(TimerState::capture(&timer));

        Ok(Self {
            timer,
            history: Arc::new(Mutex::new(Vec::new())),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            timer_event_tx,
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
        })
    }

    /// Subscribe to tick and expiry notifications
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.timer_event_tx.subscribe()
    }

    /// Apply a timer operation, record it as the last action and publish the new state
    pub fn update_timer<F>(&self, action: &str, operation: F) -> Result<TimerState, TimerError>
    where
        F: FnOnce(&Timer) -> Result<(), TimerError>,
    {
        operation(&self.timer)?;

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        Ok(self.publish_timer_state())
    }

    pub fn start_timer(&self) -> Result<TimerState, TimerError> {
        info!("Starting question timer");
        self.update_timer("start", Timer::start)
    }

    pub fn stop_timer(&self) -> Result<TimerState, TimerError> {
        info!("Stopping question timer");
        self.update_timer("stop", |timer| {
            timer.stop();
            Ok(())
        })
    }

    pub fn pause_timer(&self) -> Result<TimerState, TimerError> {
        info!("Pausing question timer");
        self.update_timer("pause", |timer| {
            timer.pause();
            Ok(())
        })
    }

    pub fn resume_timer(&self) -> Result<TimerState, TimerError> {
        info!("Resuming question timer");
        self.update_timer("resume", |timer| {
            timer.resume();
            Ok(())
        })
    }

    /// Reset the timer for the next question, recording the unfinished one
    pub fn reset_timer(&self, duration_seconds: Option<u64>) -> Result<TimerState, TimerError> {
        if let Some(duration) = duration_seconds {
            validate_duration(duration)?;
        }

        let before = TimerState::capture(&self.timer);
        if before.has_progress() && before.phase != TimerPhase::Expired {
            self.record_question(QuestionRecord::finished(&before, QuestionOutcome::Reset));
        }

        info!("Resetting question timer (duration={:?})", duration_seconds);
        self.update_timer("reset", |timer| timer.reset(duration_seconds))
    }

    /// Append a finished question to the history
    pub fn record_question(&self, record: QuestionRecord) {
        match self.history.lock() {
            Ok(mut history) => {
                info!(
                    "Recording {:?} question: {}s of {}s spent",
                    record.outcome, record.time_spent_seconds, record.duration_seconds
                );
                history.push(record);
            }
            Err(e) => warn!("Failed to lock question history: {}", e),
        }
    }

    /// Get all finished questions
    pub fn get_history(&self) -> Result<Vec<QuestionRecord>, String> {
        self.history.lock()
            .map(|history| history.clone())
            .map_err(|e| format!("Failed to lock question history: {}", e))
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> TimerState {
        TimerState::capture(&self.timer)
    }

    /// Capture the timer and notify timer state watchers
    pub fn publish_timer_state(&self) -> TimerState {
        let timer_state = TimerState::capture(&self.timer);

        if let Err(e) = self.timer_update_tx.send(timer_state.clone()) {
            warn!("Failed to send timer update: {}", e);
        }

        timer_state
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

fn format_uptime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
