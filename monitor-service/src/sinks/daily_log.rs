use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use meter_model::AlertLine;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::pipeline::{AlertSink, PipelineError};

const LOG_SUFFIX: &str = "_log.txt";

/// Per-day alert log files under a single directory.
///
/// Each calendar day gets `YYYY-MM-DD_log.txt`, created on first write and
/// reopened in append mode on every write. Lines are never rewritten.
pub struct DailyLogSink {
    dir: PathBuf,
}

impl DailyLogSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_id_for(date: Date) -> String {
        let day = date
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| date.to_string());
        format!("{day}{LOG_SUFFIX}")
    }

    pub fn append_for_date(&self, date: Date, lines: &[AlertLine]) -> Result<(), PipelineError> {
        if lines.is_empty() {
            return Ok(());
        }

        // One write per batch.
        let mut buf = String::new();
        for line in lines {
            buf.push_str(&line.to_string());
            buf.push('\n');
        }

        let path = self.dir.join(Self::log_id_for(date));
        let write = || -> io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(buf.as_bytes())
        };
        write().map_err(|e| {
            metrics::counter!("alert_log_write_errors_total").increment(1);
            PipelineError::LogWrite(format!("failed to append to '{}': {e}", path.display()))
        })
    }

    /// Available log ids, most recent first. A missing directory has no logs.
    pub fn list_logs(&self) -> Result<Vec<String>, PipelineError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PipelineError::LogRead(format!(
                    "failed to list '{}': {e}",
                    self.dir.display()
                )))
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::LogRead(e.to_string()))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                ids.push(name.to_string());
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    pub fn read_log(&self, id: &str) -> Result<String, PipelineError> {
        if id.is_empty() || id.contains(|c: char| c == '/' || c == '\\') || id.contains("..") {
            return Err(PipelineError::LogRead(format!("invalid log id '{id}'")));
        }
        let path = self.dir.join(id);
        fs::read_to_string(&path)
            .map_err(|e| PipelineError::LogRead(format!("failed to read '{}': {e}", path.display())))
    }
}

impl AlertSink for DailyLogSink {
    fn append(&self, lines: &[AlertLine]) -> Result<(), PipelineError> {
        self.append_for_date(today(), lines)
    }
}

fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_model::AnomalyReason;
    use time::macros::{date, datetime};

    fn lines() -> Vec<AlertLine> {
        AlertLine::for_reasons(
            datetime!(2023-07-01 00:30:00),
            &[AnomalyReason::VoltageAnomaly, AnomalyReason::FrequencyAnomaly],
        )
    }

    #[test]
    fn log_id_is_named_by_date() {
        assert_eq!(DailyLogSink::log_id_for(date!(2024-03-09)), "2024-03-09_log.txt");
        assert_eq!(DailyLogSink::log_id_for(date!(2025-01-02)), "2025-01-02_log.txt");
    }

    #[test]
    fn appends_lines_with_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyLogSink::new(dir.path().join("logs"));
        let day = date!(2024-03-09);

        sink.append_for_date(day, &lines()).unwrap();
        sink.append_for_date(day, &lines()[..1]).unwrap();

        let content = sink.read_log("2024-03-09_log.txt").unwrap();
        assert_eq!(
            content,
            "[2023-07-01 00:30:00] - Voltage anomaly\n\
             [2023-07-01 00:30:00] - Frequency anomaly\n\
             [2023-07-01 00:30:00] - Voltage anomaly\n"
        );
    }

    #[test]
    fn empty_batch_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyLogSink::new(dir.path().join("logs"));
        sink.append_for_date(date!(2024-03-09), &[]).unwrap();
        assert!(sink.list_logs().unwrap().is_empty());
    }

    #[test]
    fn lists_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyLogSink::new(dir.path());
        for day in [date!(2024-03-09), date!(2024-03-11), date!(2023-12-31)] {
            sink.append_for_date(day, &lines()).unwrap();
        }
        assert_eq!(
            sink.list_logs().unwrap(),
            vec!["2024-03-11_log.txt", "2024-03-09_log.txt", "2023-12-31_log.txt"]
        );
    }

    #[test]
    fn missing_directory_has_no_logs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyLogSink::new(dir.path().join("never-created"));
        assert!(sink.list_logs().unwrap().is_empty());
    }

    #[test]
    fn read_log_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyLogSink::new(dir.path());
        assert!(matches!(sink.read_log("../etc/passwd"), Err(PipelineError::LogRead(_))));
        assert!(matches!(sink.read_log("a/b"), Err(PipelineError::LogRead(_))));
    }

    #[test]
    fn write_failure_is_reported_not_panicked() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot act as the log directory.
        let sink = DailyLogSink::new(file.path());
        let err = sink.append(&lines()).unwrap_err();
        assert!(matches!(err, PipelineError::LogWrite(_)));
    }
}
