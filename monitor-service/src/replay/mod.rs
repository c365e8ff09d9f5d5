//! Paced replay of a telemetry CSV through anomaly detection and alerting.
//!
//! The driver is strictly sequential: pull one row, evaluate it, persist and
//! send any alerts, hand the outcome to the observer, then sleep for the
//! configured interval. Per-row, log and notifier failures are reported in
//! the step outcome and the summary; none of them stop the replay.

mod observer;

pub use observer::{ReplayObserver, TracingObserver};

use std::time::{Duration, SystemTime};

use meter_model::{AlertLine, TelemetryRow};

use crate::{
    pipeline::{AlertSink, Envelope, Notifier, NotifyStatus, PipelineError, Transform},
    sources::TelemetryCsvCursor,
    transform::AnomalyDetection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    Streaming,
    Completed,
}

/// What happened on one replay step.
#[derive(Debug)]
pub enum StepOutcome {
    AllClear {
        row: TelemetryRow,
    },
    Alerted {
        row: TelemetryRow,
        lines: Vec<AlertLine>,
        logged: Result<(), PipelineError>,
        notified: Result<NotifyStatus, PipelineError>,
    },
    /// The row at `position` (zero-based) could not be evaluated.
    Skipped {
        position: usize,
        error: PipelineError,
    },
    EndOfStream,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub rows_replayed: usize,
    pub rows_skipped: usize,
    pub alert_lines: Vec<AlertLine>,
    pub notify_failures: usize,
    pub log_write_failures: usize,
}

pub struct ReplayDriver<K, N, O> {
    cursor: TelemetryCsvCursor,
    detection: AnomalyDetection,
    sink: K,
    notifier: N,
    observer: O,
    interval: Duration,
    history_limit: usize,
    state: ReplayState,
    summary: ReplaySummary,
}

impl<K, N, O> ReplayDriver<K, N, O>
where
    K: AlertSink,
    N: Notifier,
    O: ReplayObserver,
{
    pub fn new(
        cursor: TelemetryCsvCursor,
        detection: AnomalyDetection,
        sink: K,
        notifier: N,
        observer: O,
        interval: Duration,
        history_limit: usize,
    ) -> Self {
        Self {
            cursor,
            detection,
            sink,
            notifier,
            observer,
            interval,
            history_limit,
            state: ReplayState::Idle,
            summary: ReplaySummary::default(),
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Process exactly one row, or report the end of the stream.
    pub async fn step(&mut self) -> StepOutcome {
        if self.state == ReplayState::Completed {
            return StepOutcome::EndOfStream;
        }
        self.state = ReplayState::Streaming;

        let position = self.cursor.position();
        let outcome = match self.cursor.next_reading() {
            None => {
                self.state = ReplayState::Completed;
                StepOutcome::EndOfStream
            }
            Some(Err(e)) => self.skip(position, e.into()),
            Some(Ok(row)) => self.evaluate(position, Envelope::new(row)).await,
        };

        self.observer
            .observe(&outcome, self.cursor.history(self.history_limit));
        outcome
    }

    async fn evaluate(&mut self, position: usize, env: Envelope<TelemetryRow>) -> StepOutcome {
        let report = match self.detection.apply(env) {
            Ok(report) => report,
            Err(e) => return self.skip(position, e),
        };
        let received_at = report.received_at;
        let report = report.payload;
        self.summary.rows_replayed += 1;
        metrics::counter!("telemetry_rows_replayed_total").increment(1);

        let outcome = if report.is_clear() {
            StepOutcome::AllClear { row: report.row }
        } else {
            let logged = self.sink.append(&report.lines);
            if logged.is_err() {
                self.summary.log_write_failures += 1;
            }

            let notified = self.notifier.notify(&report.lines).await;
            if notified.is_err() {
                self.summary.notify_failures += 1;
            }

            self.summary.alert_lines.extend(report.lines.iter().cloned());
            StepOutcome::Alerted {
                row: report.row,
                lines: report.lines,
                logged,
                notified,
            }
        };

        if let Ok(dur) = SystemTime::now().duration_since(received_at) {
            metrics::histogram!("replay_step_latency_seconds").record(dur.as_secs_f64());
        }
        outcome
    }

    fn skip(&mut self, position: usize, error: PipelineError) -> StepOutcome {
        self.summary.rows_skipped += 1;
        metrics::counter!("telemetry_rows_skipped_total").increment(1);
        StepOutcome::Skipped { position, error }
    }

    /// Replay until the cursor is exhausted, sleeping the fixed interval after
    /// every row whatever its outcome.
    pub async fn run(mut self) -> ReplaySummary {
        tracing::info!(
            rows = self.cursor.len(),
            interval_ms = self.interval.as_millis() as u64,
            "replay started"
        );

        loop {
            if let StepOutcome::EndOfStream = self.step().await {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        self.observer.completed(&self.summary);
        self.summary
    }
}
