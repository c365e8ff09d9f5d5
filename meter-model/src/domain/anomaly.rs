use std::fmt;

use time::PrimitiveDateTime;

use super::telemetry::format_timestamp;

/// Why a telemetry row failed a threshold check.
///
/// Variants are declared in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyReason {
    VoltageAnomaly,
    LowPowerFactor,
    NegativeActivePower,
    FrequencyAnomaly,
    ZeroEnergyConsumption,
}

impl AnomalyReason {
    pub const ALL: [AnomalyReason; 5] = [
        AnomalyReason::VoltageAnomaly,
        AnomalyReason::LowPowerFactor,
        AnomalyReason::NegativeActivePower,
        AnomalyReason::FrequencyAnomaly,
        AnomalyReason::ZeroEnergyConsumption,
    ];

    /// Human-readable label written to logs and emails.
    pub fn label(self) -> &'static str {
        match self {
            AnomalyReason::VoltageAnomaly => "Voltage anomaly",
            AnomalyReason::LowPowerFactor => "Low power factor",
            AnomalyReason::NegativeActivePower => "Negative active power",
            AnomalyReason::FrequencyAnomaly => "Frequency anomaly",
            AnomalyReason::ZeroEnergyConsumption => "Zero energy consumption",
        }
    }

    /// Stable snake_case key, used as a metric label.
    pub fn key(self) -> &'static str {
        match self {
            AnomalyReason::VoltageAnomaly => "voltage_anomaly",
            AnomalyReason::LowPowerFactor => "low_power_factor",
            AnomalyReason::NegativeActivePower => "negative_active_power",
            AnomalyReason::FrequencyAnomaly => "frequency_anomaly",
            AnomalyReason::ZeroEnergyConsumption => "zero_energy_consumption",
        }
    }
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A timestamped anomaly, rendered as `[<timestamp>] - <reason>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertLine {
    pub ts: PrimitiveDateTime,
    pub reason: AnomalyReason,
}

impl AlertLine {
    pub fn new(ts: PrimitiveDateTime, reason: AnomalyReason) -> Self {
        Self { ts, reason }
    }

    /// One line per reason, all stamped with the same row timestamp.
    pub fn for_reasons(ts: PrimitiveDateTime, reasons: &[AnomalyReason]) -> Vec<AlertLine> {
        reasons.iter().map(|&reason| AlertLine::new(ts, reason)).collect()
    }
}

impl fmt::Display for AlertLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] - {}", format_timestamp(self.ts), self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn alert_line_renders_bracketed_timestamp() {
        let line = AlertLine::new(datetime!(2023-07-01 00:30:00), AnomalyReason::LowPowerFactor);
        assert_eq!(line.to_string(), "[2023-07-01 00:30:00] - Low power factor");
    }

    #[test]
    fn for_reasons_keeps_order() {
        let ts = datetime!(2023-07-01 00:30:00);
        let lines = AlertLine::for_reasons(
            ts,
            &[AnomalyReason::FrequencyAnomaly, AnomalyReason::ZeroEnergyConsumption],
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].reason, AnomalyReason::FrequencyAnomaly);
        assert_eq!(lines[1].reason, AnomalyReason::ZeroEnergyConsumption);
    }
}
