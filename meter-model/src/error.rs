/// Failure attached to a single telemetry row.
///
/// A row error never invalidates the rest of the stream; the replay skips the
/// row and moves on.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing value for column '{column}'")]
    MissingField { column: &'static str },
    #[error("invalid value '{value}' for column '{column}': {reason}")]
    InvalidField {
        column: &'static str,
        value: String,
        reason: String,
    },
    #[error("non-finite {field} reading ({value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("malformed record: {0}")]
    Malformed(String),
}
