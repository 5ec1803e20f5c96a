//! Shared logging utilities for consistent tracing across feeds

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::types::FeedName;

/// Build the env-filter directive used by the console binaries
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("realtime={base_level},shared={base_level},tungstenite=warn,tokio_tungstenite=warn,reqwest=warn,hyper=warn")
}

/// Initialize tracing subscriber with an optional log level.
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for feed-aware info logging
#[macro_export]
macro_rules! feed_info {
    ($feed:expr, $($arg:tt)*) => {
        tracing::info!(
            feed = %$feed,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for feed-aware warning logging
#[macro_export]
macro_rules! feed_warn {
    ($feed:expr, $($arg:tt)*) => {
        tracing::warn!(
            feed = %$feed,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for feed-aware error logging
#[macro_export]
macro_rules! feed_error {
    ($feed:expr, $($arg:tt)*) => {
        tracing::error!(
            feed = %$feed,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for feed-aware debug logging
#[macro_export]
macro_rules! feed_debug {
    ($feed:expr, $($arg:tt)*) => {
        tracing::debug!(
            feed = %$feed,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(feed: &FeedName, details: &str) {
    info!(
        feed = %feed,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(feed: &FeedName, reason: &str) {
    info!(
        feed = %feed,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(feed: &FeedName, context: &str, error: &dyn std::fmt::Display) {
    error!(
        feed = %feed,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}
