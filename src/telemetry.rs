use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes structured logging. Emits JSON to stdout; the log level is
/// controlled with the RUST_LOG environment variable.
pub fn init_telemetry() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .init();
}
