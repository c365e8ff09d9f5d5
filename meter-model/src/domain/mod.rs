pub mod anomaly;
pub mod telemetry;

pub use anomaly::{AlertLine, AnomalyReason};
pub use telemetry::TelemetryRow;
