use crate::pipeline::{Envelope, PipelineError, Transform};
use meter_model::{evaluate, AlertLine, AnomalyReason, AnomalyThresholds, TelemetryRow};

/// A row together with the anomaly verdict for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyReport {
    pub row: TelemetryRow,
    pub reasons: Vec<AnomalyReason>,
    pub lines: Vec<AlertLine>,
}

impl AnomalyReport {
    pub fn is_clear(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Pure anomaly detection over a `TelemetryRow`.
///
/// Rejects the row when a measurement the rules depend on is not a finite number.
pub fn detect_anomalies(
    env: Envelope<TelemetryRow>,
    thresholds: &AnomalyThresholds,
) -> Result<Envelope<AnomalyReport>, PipelineError> {
    let reasons = evaluate(&env.payload, thresholds)?;
    let lines = AlertLine::for_reasons(env.payload.ts, &reasons);

    Ok(Envelope {
        payload: AnomalyReport {
            row: env.payload,
            reasons,
            lines,
        },
        received_at: env.received_at,
    })
}

#[derive(Clone, Default)]
pub struct AnomalyDetection {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetection {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }
}

impl Transform<TelemetryRow, AnomalyReport> for AnomalyDetection {
    fn apply(&self, input: Envelope<TelemetryRow>) -> Result<Envelope<AnomalyReport>, PipelineError> {
        match detect_anomalies(input, &self.thresholds) {
            Ok(env) => {
                for reason in &env.payload.reasons {
                    metrics::counter!("anomalies_detected_total", "reason" => reason.key()).increment(1);
                }
                Ok(env)
            }
            Err(e) => {
                metrics::counter!("anomaly_detection_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
