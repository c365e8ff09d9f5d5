use serde::Deserialize;

use crate::domain::{AnomalyReason, TelemetryRow};
use crate::error::RowError;

/// Threshold set for the anomaly rules.
///
/// Defaults:
/// - voltage outside [180, 250] V
/// - power factor below 0.5
/// - frequency outside [48.5, 51.5] Hz
///
/// Negative active power and zero block energy have no tunable bound.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    pub voltage_min: f64,
    pub voltage_max: f64,
    pub power_factor_min: f64,
    pub frequency_min: f64,
    pub frequency_max: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            voltage_min: 180.0,
            voltage_max: 250.0,
            power_factor_min: 0.5,
            frequency_min: 48.5,
            frequency_max: 51.5,
        }
    }
}

impl AnomalyThresholds {
    /// Bounds must be finite and each range must be ordered.
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [
            ("voltage_min", self.voltage_min),
            ("voltage_max", self.voltage_max),
            ("power_factor_min", self.power_factor_min),
            ("frequency_min", self.frequency_min),
            ("frequency_max", self.frequency_max),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("threshold {name} must be finite"));
        }
        if self.voltage_min > self.voltage_max {
            return Err("voltage_min must not exceed voltage_max".to_string());
        }
        if self.frequency_min > self.frequency_max {
            return Err("frequency_min must not exceed frequency_max".to_string());
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, RowError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RowError::NonFinite { field, value })
    }
}

/// Evaluate every rule against one row.
///
/// Rules are independent; all that match are returned, in the order they are
/// declared on [`AnomalyReason`]. A non-finite measurement makes the row
/// unevaluable and yields an error for that row only.
pub fn evaluate(
    row: &TelemetryRow,
    thresholds: &AnomalyThresholds,
) -> Result<Vec<AnomalyReason>, RowError> {
    let voltage = finite("voltage", row.voltage)?;
    let power_factor = finite("power factor", row.power_factor)?;
    let active_power = finite("active power", row.active_power_kw)?;
    let frequency = finite("frequency", row.frequency)?;
    let block_energy = finite("block energy", row.block_energy_kwh)?;

    let mut reasons = Vec::new();

    if voltage < thresholds.voltage_min || voltage > thresholds.voltage_max {
        reasons.push(AnomalyReason::VoltageAnomaly);
    }
    if power_factor < thresholds.power_factor_min {
        reasons.push(AnomalyReason::LowPowerFactor);
    }
    if active_power < 0.0 {
        reasons.push(AnomalyReason::NegativeActivePower);
    }
    if frequency < thresholds.frequency_min || frequency > thresholds.frequency_max {
        reasons.push(AnomalyReason::FrequencyAnomaly);
    }
    // Exact comparison, no tolerance.
    if block_energy == 0.0 {
        reasons.push(AnomalyReason::ZeroEnergyConsumption);
    }

    Ok(reasons)
}
