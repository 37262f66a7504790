use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise structured JSON logging.
///
/// `RUST_LOG` overrides `default_filter`. Safe to call more than once; only
/// the first call installs the subscriber.
pub fn init_telemetry(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init();
}
