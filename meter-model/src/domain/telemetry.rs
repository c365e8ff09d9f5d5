use time::{macros::format_description, Date, PrimitiveDateTime, Time};

use crate::error::RowError;

pub const COL_TIMESTAMP: &str = "RealtimeClockDateandTime";
pub const COL_METER_ID: &str = "METERSNO";
pub const COL_VOLTAGE: &str = "Voltage";
pub const COL_CURRENT: &str = "NormalPhaseCurrent";
pub const COL_POWER_FACTOR: &str = "SystemPowerFactor";
pub const COL_FREQUENCY: &str = "Frequency";
pub const COL_ACTIVE_POWER_KW: &str = "ActivePower_kW";
pub const COL_BLOCK_ENERGY_KWH: &str = "BlockEnergykWh";
pub const COL_CUMULATIVE_ENERGY_KWH: &str = "CumulativeEnergykWh";
pub const COL_LATITUDE: &str = "Latitude";
pub const COL_LONGITUDE: &str = "Longitude";

/// Columns a telemetry CSV must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    COL_TIMESTAMP,
    COL_METER_ID,
    COL_VOLTAGE,
    COL_CURRENT,
    COL_POWER_FACTOR,
    COL_FREQUENCY,
    COL_ACTIVE_POWER_KW,
    COL_BLOCK_ENERGY_KWH,
    COL_CUMULATIVE_ENERGY_KWH,
    COL_LATITUDE,
    COL_LONGITUDE,
];

/// One smart-meter sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRow {
    pub ts: PrimitiveDateTime,
    pub meter_id: String,
    pub voltage: f64,
    pub current: f64,
    pub power_factor: f64,
    pub frequency: f64,
    pub active_power_kw: f64,
    pub block_energy_kwh: f64,
    pub cumulative_energy_kwh: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Parse a meter clock reading, day-first.
///
/// `01/07/2023 00:30` is the 1st of July. ISO `YYYY-MM-DD` readings are also
/// accepted since the year-first layout is unambiguous. A date without a time
/// of day is taken as midnight.
pub fn parse_timestamp(raw: &str) -> Result<PrimitiveDateTime, RowError> {
    let s = raw.trim();

    let date_times = [
        format_description!(
            "[day padding:none]/[month padding:none]/[year] [hour padding:none]:[minute]:[second]"
        ),
        format_description!("[day padding:none]/[month padding:none]/[year] [hour padding:none]:[minute]"),
        format_description!(
            "[day padding:none]-[month padding:none]-[year] [hour padding:none]:[minute]:[second]"
        ),
        format_description!("[day padding:none]-[month padding:none]-[year] [hour padding:none]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    if let Some(ts) = date_times
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(s, fmt).ok())
    {
        return Ok(ts);
    }

    let dates = [
        format_description!("[day padding:none]/[month padding:none]/[year]"),
        format_description!("[day padding:none]-[month padding:none]-[year]"),
        format_description!("[year]-[month]-[day]"),
    ];
    dates
        .iter()
        .find_map(|fmt| Date::parse(s, fmt).ok())
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT))
        .ok_or_else(|| RowError::InvalidField {
            column: COL_TIMESTAMP,
            value: raw.to_string(),
            reason: "expected a day-first date-time such as 31/12/2023 23:30".to_string(),
        })
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: PrimitiveDateTime) -> String {
    ts.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| ts.to_string())
}
