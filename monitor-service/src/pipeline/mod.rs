use std::time::SystemTime;

use meter_model::{AlertLine, RowError};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("data load error: {0}")]
    DataLoad(String),
    #[error("row evaluation error: {0}")]
    RowEvaluation(#[from] RowError),
    #[error("notify error: {0}")]
    Notify(String),
    #[error("log write error: {0}")]
    LogWrite(String),
    #[error("log read error: {0}")]
    LogRead(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("forecast error: {0}")]
    Forecast(String),
}

pub trait Transform<I, O>: Send + Sync {
    fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

/// Append-only destination for alert lines.
pub trait AlertSink: Send + Sync {
    fn append(&self, lines: &[AlertLine]) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    Sent,
    /// Nothing to send, or alerting is switched off.
    Skipped,
}

/// Best-effort, at-most-once delivery of the alert lines for one row.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, lines: &[AlertLine]) -> Result<NotifyStatus, PipelineError>;
}
