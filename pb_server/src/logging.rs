//! Structured logging configuration.
//!
//! Records from the `log` facade (the engine and the session gateway) are
//! bridged into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from the `RUST_LOG` env var, defaulting to `info`.
///
/// # Example
///
/// ```no_run
/// use pb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the end of a player session with structured fields
pub fn log_session_closed(room: &str, player_id: &str, messages: u64) {
    tracing::info!(
        room = room,
        player_id = player_id,
        messages = messages,
        "Session closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_session_closed() {
        // Just ensure it doesn't panic without a subscriber
        log_session_closed("lobby", "p-1", 12);
    }
}
