pub mod config;
pub mod forecast;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod replay;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, PipelineError};
pub use replay::{ReplayDriver, ReplaySummary};
