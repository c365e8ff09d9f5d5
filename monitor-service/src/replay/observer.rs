use meter_model::{domain::telemetry::format_timestamp, RowError, TelemetryRow};

use super::{ReplaySummary, StepOutcome};

/// Receives every step of a replay, e.g. to drive a display.
pub trait ReplayObserver {
    /// `history` holds the most recently consumed rows, oldest first, ending
    /// with the row this outcome is about.
    fn observe(&mut self, outcome: &StepOutcome, history: &[Result<TelemetryRow, RowError>]);

    fn completed(&mut self, _summary: &ReplaySummary) {}
}

/// Renders each step as structured log events.
#[derive(Debug, Default)]
pub struct TracingObserver;

fn render_row(row: &TelemetryRow, history: &[Result<TelemetryRow, RowError>]) {
    let energy: Vec<f64> = history
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|r| r.block_energy_kwh)
        .collect();
    let window_kwh: f64 = energy.iter().sum();

    tracing::info!(
        meter_id = %row.meter_id,
        time = %format_timestamp(row.ts),
        voltage = row.voltage,
        current = row.current,
        power_factor = row.power_factor,
        frequency = row.frequency,
        active_power_kw = row.active_power_kw,
        block_energy_kwh = row.block_energy_kwh,
        cumulative_energy_kwh = row.cumulative_energy_kwh,
        window_rows = energy.len(),
        window_kwh,
        latitude = row.latitude,
        longitude = row.longitude,
        "reading"
    );
}

impl ReplayObserver for TracingObserver {
    fn observe(&mut self, outcome: &StepOutcome, history: &[Result<TelemetryRow, RowError>]) {
        match outcome {
            StepOutcome::AllClear { row } => {
                render_row(row, history);
                tracing::info!("no anomalies detected");
            }
            StepOutcome::Alerted {
                row,
                lines,
                logged,
                notified,
            } => {
                render_row(row, history);
                for line in lines {
                    tracing::warn!(alert = %line, "anomaly");
                }
                if let Err(e) = logged {
                    tracing::error!(error = %e, "alert not written to log");
                }
                if let Err(e) = notified {
                    tracing::error!(error = %e, "alert email failed");
                }
            }
            StepOutcome::Skipped { position, error } => {
                tracing::warn!(position, error = %error, "row skipped");
            }
            StepOutcome::EndOfStream => {
                tracing::info!("monitoring completed");
            }
        }
    }

    fn completed(&mut self, summary: &ReplaySummary) {
        tracing::info!(
            rows_replayed = summary.rows_replayed,
            rows_skipped = summary.rows_skipped,
            alerts = summary.alert_lines.len(),
            notify_failures = summary.notify_failures,
            log_write_failures = summary.log_write_failures,
            "replay summary"
        );
        for line in &summary.alert_lines {
            tracing::info!(alert = %line, "summary");
        }
    }
}
