use std::{fs::File, io::Read, path::{Path, PathBuf}};

use csv::StringRecord;
use meter_model::{
    domain::telemetry::{self, parse_timestamp, REQUIRED_COLUMNS},
    RowError, TelemetryRow,
};

use crate::pipeline::PipelineError;

/// Sequential reader over a smart-meter telemetry CSV.
///
/// The whole file is loaded at construction; reading only moves a cursor.
/// Expected header columns (by name, any order, extras ignored):
/// - RealtimeClockDateandTime (day-first)
/// - METERSNO
/// - Voltage, NormalPhaseCurrent, SystemPowerFactor, Frequency
/// - ActivePower_kW, BlockEnergykWh, CumulativeEnergykWh
/// - Latitude, Longitude
///
/// A row that fails to parse is kept in place as an error so positions stay
/// aligned with the file; the caller decides to skip it.
pub struct TelemetryCsvCursor {
    source: Option<PathBuf>,
    rows: Vec<Result<TelemetryRow, RowError>>,
    position: usize,
}

/// Header position of every required column.
struct ColumnIndex([usize; REQUIRED_COLUMNS.len()]);

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, PipelineError> {
        let mut idx = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
            match headers.iter().position(|h| h.trim() == name) {
                Some(pos) => *slot = pos,
                None => missing.push(name),
            }
        }
        if missing.is_empty() {
            Ok(Self(idx))
        } else {
            Err(PipelineError::DataLoad(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &'static str) -> Result<&'r str, RowError> {
        let slot = REQUIRED_COLUMNS
            .iter()
            .position(|c| *c == column)
            .ok_or(RowError::MissingField { column })?;
        match record.get(self.0[slot]).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(RowError::MissingField { column }),
        }
    }
}

fn parse_f64(value: &str, column: &'static str) -> Result<f64, RowError> {
    value.parse().map_err(|e: std::num::ParseFloatError| RowError::InvalidField {
        column,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn record_to_telemetry_row(record: &StringRecord, columns: &ColumnIndex) -> Result<TelemetryRow, RowError> {
    let number = |column: &'static str| -> Result<f64, RowError> {
        parse_f64(columns.get(record, column)?, column)
    };

    Ok(TelemetryRow {
        ts: parse_timestamp(columns.get(record, telemetry::COL_TIMESTAMP)?)?,
        meter_id: columns.get(record, telemetry::COL_METER_ID)?.to_string(),
        voltage: number(telemetry::COL_VOLTAGE)?,
        current: number(telemetry::COL_CURRENT)?,
        power_factor: number(telemetry::COL_POWER_FACTOR)?,
        frequency: number(telemetry::COL_FREQUENCY)?,
        active_power_kw: number(telemetry::COL_ACTIVE_POWER_KW)?,
        block_energy_kwh: number(telemetry::COL_BLOCK_ENERGY_KWH)?,
        cumulative_energy_kwh: number(telemetry::COL_CUMULATIVE_ENERGY_KWH)?,
        latitude: number(telemetry::COL_LATITUDE)?,
        longitude: number(telemetry::COL_LONGITUDE)?,
    })
}

impl TelemetryCsvCursor {
    /// Load a telemetry CSV from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::DataLoad(format!("failed to open CSV file '{}': {e}", path.display()))
        })?;
        let mut cursor = Self::from_reader(file)?;
        cursor.source = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            rows = cursor.len(),
            "telemetry CSV loaded"
        );
        Ok(cursor)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PipelineError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| PipelineError::DataLoad(format!("failed to read CSV headers: {e}")))?
            .clone();
        let columns = ColumnIndex::resolve(&headers)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let row = match result {
                Ok(record) => record_to_telemetry_row(&record, &columns),
                Err(e) if e.is_io_error() => {
                    return Err(PipelineError::DataLoad(format!("failed to read CSV record: {e}")));
                }
                Err(e) => Err(RowError::Malformed(e.to_string())),
            };
            if let Err(e) = &row {
                metrics::counter!("telemetry_csv_parse_errors_total").increment(1);
                tracing::debug!(line = rows.len() + 2, error = %e, "unparseable telemetry row");
            }
            rows.push(row);
        }

        Ok(Self {
            source: None,
            rows,
            position: 0,
        })
    }

    /// Row at the cursor, advancing by one. `None` once the table is exhausted.
    pub fn next_reading(&mut self) -> Option<Result<TelemetryRow, RowError>> {
        let row = self.rows.get(self.position)?.clone();
        self.position += 1;
        Some(row)
    }

    /// Up to `limit` most recently consumed rows, oldest first.
    pub fn history(&self, limit: usize) -> &[Result<TelemetryRow, RowError>] {
        let start = self.position.saturating_sub(limit);
        &self.rows[start..self.position]
    }

    /// Rewind to the first row. The table is not reloaded.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Iterator for TelemetryCsvCursor {
    type Item = Result<TelemetryRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_reading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "RealtimeClockDateandTime,METERSNO,Voltage,NormalPhaseCurrent,SystemPowerFactor,Frequency,ActivePower_kW,BlockEnergykWh,CumulativeEnergykWh,Latitude,Longitude";

    fn csv(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for r in rows {
            s.push('\n');
            s.push_str(r);
        }
        s
    }

    fn three_rows() -> TelemetryCsvCursor {
        let data = csv(&[
            "01/07/2023 00:00,SM1,230,4.1,0.95,50.0,1.2,0.3,100.0,17.38,78.48",
            "01/07/2023 00:30,SM1,150,4.0,0.90,50.0,2.0,1.2,101.2,17.38,78.48",
            "01/07/2023 01:00,SM1,231,4.2,0.30,52.0,-1.0,0,101.2,17.38,78.48",
        ]);
        TelemetryCsvCursor::from_reader(data.as_bytes()).unwrap()
    }

    #[test]
    fn yields_each_row_once_then_end_of_stream() {
        let mut cursor = three_rows();
        let voltages: Vec<f64> = (0..3)
            .map(|_| cursor.next_reading().unwrap().unwrap().voltage)
            .collect();
        assert_eq!(voltages, vec![230.0, 150.0, 231.0]);
        assert!(cursor.next_reading().is_none());
        assert!(cursor.next_reading().is_none());
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn reset_rewinds_to_first_row() {
        let mut cursor = three_rows();
        cursor.by_ref().for_each(drop);
        cursor.reset();
        let first = cursor.next_reading().unwrap().unwrap();
        assert_eq!(first.voltage, 230.0);
        assert_eq!(cursor.len(), 3);
    }

    #[test]
    fn history_is_clipped_to_consumed_rows() {
        let mut cursor = three_rows();
        assert!(cursor.history(10).is_empty());

        cursor.next_reading();
        cursor.next_reading();
        assert_eq!(cursor.history(10).len(), 2);

        let last = cursor.history(1);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].as_ref().unwrap().voltage, 150.0);
    }

    #[test]
    fn missing_columns_fail_construction() {
        let data = "RealtimeClockDateandTime,METERSNO,Voltage\n01/07/2023 00:00,SM1,230";
        let err = TelemetryCsvCursor::from_reader(data.as_bytes()).err().unwrap();
        match err {
            PipelineError::DataLoad(msg) => {
                assert!(msg.contains("NormalPhaseCurrent"));
                assert!(msg.contains("Longitude"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_data_load_error() {
        let err = TelemetryCsvCursor::open("/definitely/not/here.csv").err().unwrap();
        assert!(matches!(err, PipelineError::DataLoad(_)));
    }

    #[test]
    fn bad_rows_are_kept_as_row_errors() {
        let data = csv(&[
            "01/07/2023 00:00,SM1,abc,4.1,0.95,50.0,1.2,0.3,100.0,17.38,78.48",
            "01/07/2023 00:30,SM1,230,4.1,,50.0,1.2,0.3,100.0,17.38,78.48",
            "01/07/2023 01:00,SM1,230",
            "01/07/2023 01:30,SM1,230,4.1,0.95,50.0,1.2,0.3,100.0,17.38,78.48",
        ]);
        let mut cursor = TelemetryCsvCursor::from_reader(data.as_bytes()).unwrap();
        assert!(matches!(
            cursor.next_reading(),
            Some(Err(RowError::InvalidField { column: "Voltage", .. }))
        ));
        assert!(matches!(
            cursor.next_reading(),
            Some(Err(RowError::MissingField { column: "SystemPowerFactor" }))
        ));
        assert!(matches!(cursor.next_reading(), Some(Err(RowError::MissingField { .. }))));
        assert!(cursor.next_reading().unwrap().is_ok());
    }

    #[test]
    fn columns_may_appear_in_any_order() {
        let data = "Longitude,Latitude,CumulativeEnergykWh,BlockEnergykWh,ActivePower_kW,Frequency,SystemPowerFactor,NormalPhaseCurrent,Voltage,METERSNO,RealtimeClockDateandTime,Extra\n\
                    78.4,17.3,99.0,0.5,1.0,50.1,0.8,3.0,229.5,SM9,31/12/2023 23:30,x";
        let mut cursor = TelemetryCsvCursor::from_reader(data.as_bytes()).unwrap();
        let row = cursor.next_reading().unwrap().unwrap();
        assert_eq!(row.meter_id, "SM9");
        assert_eq!(row.voltage, 229.5);
        assert_eq!(row.longitude, 78.4);
    }

    #[test]
    fn open_reads_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "02/07/2023 10:15,SM2,240,5.0,0.9,50.0,3.0,0.5,10.0,12.9,77.5").unwrap();

        let mut cursor = TelemetryCsvCursor::open(file.path()).unwrap();
        assert_eq!(cursor.source(), Some(file.path()));
        assert_eq!(cursor.next_reading().unwrap().unwrap().meter_id, "SM2");
    }
}
