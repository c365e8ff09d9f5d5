//! Multi-day energy forecast from a fixed-length window of daily features.
//!
//! A window is a CSV of numeric feature columns with one row per day. The
//! window length is fixed (14 days by default) and any other row count is
//! refused before a prediction is attempted.

use std::{fs::File, io::Read, path::Path};

use serde::Serialize;

use crate::pipeline::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastWindow {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ForecastWindow {
    pub fn from_csv<P: AsRef<Path>>(path: P, input_days: usize) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::Forecast(format!("failed to open '{}': {e}", path.display()))
        })?;
        Self::from_reader(file, input_days)
    }

    pub fn from_reader<R: Read>(reader: R, input_days: usize) -> Result<Self, PipelineError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let columns: Vec<String> = rdr
            .headers()
            .map_err(|e| PipelineError::Forecast(format!("failed to read headers: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::with_capacity(input_days);
        for (i, record) in rdr.records().enumerate() {
            let record = record
                .map_err(|e| PipelineError::Forecast(format!("failed to read row {}: {e}", i + 1)))?;
            let values = record
                .iter()
                .zip(&columns)
                .map(|(cell, column)| {
                    cell.trim().parse::<f64>().map_err(|_| {
                        PipelineError::Forecast(format!(
                            "row {} column '{column}' is not numeric: '{cell}'",
                            i + 1
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push(values);
        }

        if rows.len() != input_days {
            tracing::debug!(rows = rows.len(), input_days, "forecast window rejected");
            return Err(PipelineError::Forecast(format!(
                "Upload must contain exactly {input_days} rows (days) of input features."
            )));
        }

        Ok(Self { columns, rows })
    }

    pub fn days(&self) -> usize {
        self.rows.len()
    }

    /// All values of one feature column, in day order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub label: String,
    #[serde(rename = "Predicted_kWh")]
    pub predicted_kwh: f64,
    #[serde(rename = "Predicted_kVAh")]
    pub predicted_kvah: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub days: Vec<ForecastDay>,
}

impl Forecast {
    fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let days = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (kwh, kvah))| ForecastDay {
                label: format!("Day {}", i + 1),
                predicted_kwh: kwh,
                predicted_kvah: kvah,
            })
            .collect();
        Self { days }
    }
}

pub trait Forecaster {
    fn predict(&self, window: &ForecastWindow, horizon: usize) -> Result<Forecast, PipelineError>;
}

/// Simple exponential smoothing of the two target columns, projected flat.
///
/// Stand-in for a trained sequence model; it makes no accuracy claim.
#[derive(Debug, Clone)]
pub struct SmoothingForecaster {
    alpha: f64,
    kwh_column: String,
    kvah_column: String,
}

impl SmoothingForecaster {
    pub fn new(
        alpha: f64,
        kwh_column: impl Into<String>,
        kvah_column: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        if !(0.0 < alpha && alpha < 1.0) {
            return Err(PipelineError::Forecast(
                "alpha must be between 0 and 1 (exclusive)".to_string(),
            ));
        }
        Ok(Self {
            alpha,
            kwh_column: kwh_column.into(),
            kvah_column: kvah_column.into(),
        })
    }

    fn level(&self, series: &[f64]) -> Option<f64> {
        let (first, rest) = series.split_first()?;
        Some(
            rest.iter()
                .fold(*first, |level, y| self.alpha * y + (1.0 - self.alpha) * level),
        )
    }

    fn target(&self, window: &ForecastWindow, column: &str) -> Result<f64, PipelineError> {
        let series = window
            .column(column)
            .ok_or_else(|| PipelineError::Forecast(format!("window has no '{column}' column")))?;
        self.level(&series)
            .ok_or_else(|| PipelineError::Forecast("window is empty".to_string()))
    }
}

impl Forecaster for SmoothingForecaster {
    fn predict(&self, window: &ForecastWindow, horizon: usize) -> Result<Forecast, PipelineError> {
        let kwh = self.target(window, &self.kwh_column)?;
        let kvah = self.target(window, &self.kvah_column)?;
        Ok(Forecast::from_pairs(std::iter::repeat((kwh, kvah)).take(horizon)))
    }
}
