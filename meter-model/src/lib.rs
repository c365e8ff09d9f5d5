pub mod domain;
pub mod error;
pub mod rules;

pub use domain::{AlertLine, AnomalyReason, TelemetryRow};
pub use error::RowError;
pub use rules::{evaluate, AnomalyThresholds};
