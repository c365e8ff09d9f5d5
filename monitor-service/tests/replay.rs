use std::{
    io::Write,
    sync::{Arc, Mutex},
    time::Duration,
};

use meter_model::{AlertLine, AnomalyThresholds};
use monitor_service::{
    pipeline::{Notifier, NotifyStatus, PipelineError},
    replay::{ReplayDriver, TracingObserver},
    sinks::DailyLogSink,
    sources::TelemetryCsvCursor,
    transform::AnomalyDetection,
};
use tempfile::NamedTempFile;

#[derive(Clone, Default)]
struct RecordingNotifier {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, lines: &[AlertLine]) -> Result<NotifyStatus, PipelineError> {
        if lines.is_empty() {
            return Ok(NotifyStatus::Skipped);
        }
        let batch = lines.iter().map(ToString::to_string).collect();
        self.batches.lock().unwrap().push(batch);
        Ok(NotifyStatus::Sent)
    }
}

fn telemetry_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "RealtimeClockDateandTime,METERSNO,Voltage,NormalPhaseCurrent,SystemPowerFactor,Frequency,ActivePower_kW,BlockEnergykWh,CumulativeEnergykWh,Latitude,Longitude"
    )
    .unwrap();
    writeln!(file, "01/07/2023 00:00,SM1,230,4.1,0.95,50.0,1.2,0.3,100.0,17.38,78.48").unwrap();
    writeln!(file, "01/07/2023 00:30,SM1,150,4.0,0.90,50.0,2.0,1.2,101.2,17.38,78.48").unwrap();
    writeln!(file, "01/07/2023 01:00,SM1,,4.2,0.95,50.0,1.0,0.4,101.6,17.38,78.48").unwrap();
    writeln!(file, "01/07/2023 01:30,SM1,230,4.2,0.30,52.0,-1.0,0,101.6,17.38,78.48").unwrap();
    file
}

#[tokio::test]
async fn replay_logs_and_notifies_each_anomalous_row() {
    let data = telemetry_file();
    let log_dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();

    let driver = ReplayDriver::new(
        TelemetryCsvCursor::open(data.path()).unwrap(),
        AnomalyDetection::new(AnomalyThresholds::default()),
        DailyLogSink::new(log_dir.path()),
        notifier.clone(),
        TracingObserver,
        Duration::ZERO,
        100,
    );
    let summary = driver.run().await;

    assert_eq!(summary.rows_replayed, 3);
    assert_eq!(summary.rows_skipped, 1);
    assert_eq!(summary.notify_failures, 0);
    assert_eq!(summary.log_write_failures, 0);
    assert_eq!(summary.alert_lines.len(), 5);

    let batches = notifier.batches.lock().unwrap().clone();
    assert_eq!(
        batches,
        vec![
            vec!["[2023-07-01 00:30:00] - Voltage anomaly".to_string()],
            vec![
                "[2023-07-01 01:30:00] - Low power factor".to_string(),
                "[2023-07-01 01:30:00] - Negative active power".to_string(),
                "[2023-07-01 01:30:00] - Frequency anomaly".to_string(),
                "[2023-07-01 01:30:00] - Zero energy consumption".to_string(),
            ],
        ]
    );

    let sink = DailyLogSink::new(log_dir.path());
    let logs = sink.list_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].ends_with("_log.txt"));
    let content = sink.read_log(&logs[0]).unwrap();
    assert_eq!(content.lines().count(), 5);
    assert!(content.starts_with("[2023-07-01 00:30:00] - Voltage anomaly\n"));
}

#[tokio::test]
async fn log_write_failures_do_not_stop_the_replay() {
    let data = telemetry_file();
    let not_a_dir = NamedTempFile::new().unwrap();
    let notifier = RecordingNotifier::default();

    let driver = ReplayDriver::new(
        TelemetryCsvCursor::open(data.path()).unwrap(),
        AnomalyDetection::default(),
        DailyLogSink::new(not_a_dir.path()),
        notifier.clone(),
        TracingObserver,
        Duration::ZERO,
        100,
    );
    let summary = driver.run().await;

    assert_eq!(summary.rows_replayed, 3);
    assert_eq!(summary.log_write_failures, 2);
    assert_eq!(notifier.batches.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn every_row_is_paced_by_the_interval() {
    let data = telemetry_file();
    let log_dir = tempfile::tempdir().unwrap();

    let driver = ReplayDriver::new(
        TelemetryCsvCursor::open(data.path()).unwrap(),
        AnomalyDetection::default(),
        DailyLogSink::new(log_dir.path()),
        RecordingNotifier::default(),
        TracingObserver,
        Duration::from_secs(5),
        100,
    );

    let start = tokio::time::Instant::now();
    driver.run().await;
    // Four rows, skipped one included; no sleep after end of stream.
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}
