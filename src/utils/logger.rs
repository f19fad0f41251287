use std::io;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
pub fn init_logger() {
    // Use RUST_LOG environment variable, default to info level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // try_init so a second call (tests, embedding apps) is a no-op
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr) // stdout carries command output
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .try_init();
}

/// Log an info message with a short tag prefix
pub fn log_info(tag: &str, message: impl std::fmt::Display) {
    info!("[{}] {}", tag, message);
}

/// Log a warning message with a short tag prefix
pub fn log_warn(tag: &str, message: impl std::fmt::Display) {
    warn!("[{}] {}", tag, message);
}

/// Log an error message with a short tag prefix
pub fn log_error(tag: &str, message: impl std::fmt::Display) {
    error!("[{}] {}", tag, message);
}

/// Log a debug message
pub fn log_debug(message: impl std::fmt::Display) {
    debug!("{}", message);
}

/// Status line for the terminal (busy indicator, progress)
pub fn log_status(message: impl std::fmt::Display) {
    eprintln!("{}", message);
}
