use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparseable.
const DEFAULT_DIRECTIVES: &str = "warn,monitor_service=info,alert_logs=info,forecast_window=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
