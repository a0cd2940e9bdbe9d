//! Timer event background task

use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, info, warn};

use crate::state::{AppState, QuestionRecord, TimerEvent};

/// Background task that mirrors timer callbacks into the application state.
///
/// Every event refreshes the published timer snapshot; an expiry also
/// records the finished question in the history.
pub async fn timer_event_task(state: Arc<AppState>, mut events: Receiver<TimerEvent>) {
    info!("Starting timer event task");

    loop {
        match events.recv().await {
            Ok(TimerEvent::Tick { remaining_seconds }) => {
                debug!("Question timer tick: {}s remaining", remaining_seconds);
                state.publish_timer_state();
            }
            Ok(TimerEvent::Expired(cycle)) => {
                info!("Question time is up");
                state.publish_timer_state();
                state.record_question(QuestionRecord::expired(&cycle));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Timer event task lagged, skipped {} events", skipped);
                state.publish_timer_state();
            }
            Err(RecvError::Closed) => {
                info!("Timer event channel closed, stopping timer event task");
                break;
            }
        }
    }
}
