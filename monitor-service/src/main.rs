use anyhow::Result;
use meter_model::AlertLine;
use monitor_service::{
    config::AppConfig,
    metrics_server,
    observability,
    pipeline::{Notifier, NotifyStatus, PipelineError},
    replay::{ReplayDriver, TracingObserver},
    sinks::{DailyLogSink, DisabledNotifier, EmailNotifier},
    sources::TelemetryCsvCursor,
    transform::AnomalyDetection,
};
use std::{env, path::PathBuf, time::Duration};

enum AlertNotifier {
    Email(EmailNotifier),
    Disabled(DisabledNotifier),
}

#[async_trait::async_trait]
impl Notifier for AlertNotifier {
    async fn notify(&self, lines: &[AlertLine]) -> Result<NotifyStatus, PipelineError> {
        match self {
            Self::Email(n) => n.notify(lines).await,
            Self::Disabled(n) => n.notify(lines).await,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let data_path = cfg.source.resolve_path(env::args().nth(1).map(PathBuf::from));
    let cursor = TelemetryCsvCursor::open(&data_path)?;

    let notifier = match (&cfg.alerts.smtp, cfg.alerts.email_enabled) {
        (Some(smtp), true) => AlertNotifier::Email(EmailNotifier::new(smtp)?),
        _ => AlertNotifier::Disabled(DisabledNotifier),
    };

    let driver = ReplayDriver::new(
        cursor,
        AnomalyDetection::new(cfg.thresholds),
        DailyLogSink::new(&cfg.alerts.log_dir),
        notifier,
        TracingObserver,
        Duration::from_millis(cfg.replay.refresh_interval_ms),
        cfg.replay.history_limit,
    );

    driver.run().await;

    Ok(())
}
