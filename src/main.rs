//! Quiz Timer - A pausable countdown timer for time-limited quiz questions
//! 
//! This is the main entry point for the quiz-timer server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use quiz_timer::{
    config::Config,
    state::AppState,
    api::create_router,
    tasks::timer_event_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("quiz_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting quiz-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, duration={}s",
          config.host, config.port, config.duration);

    // Create application state
    let state = Arc::new(AppState::new(config.port, config.host.clone(), config.duration)?);

    // Mirror timer callbacks into the application state
    let events = state.subscribe_events();
    tokio::spawn(timer_event_task(Arc::clone(&state), events));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start  - Start the question countdown");
    info!("  POST /timer/stop   - Stop the countdown, keeping remaining time");
    info!("  POST /timer/pause  - Pause the countdown");
    info!("  POST /timer/resume - Resume the countdown");
    info!("  POST /timer/reset  - Reset for the next question");
    info!("  GET  /status       - Timer state and question history");
    info!("  GET  /health       - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.timer.stop();
    info!("Server shutdown complete");
    Ok(())
}
