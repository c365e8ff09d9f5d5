use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use meter_model::AlertLine;

use crate::{
    config::SmtpConfig,
    pipeline::{Notifier, NotifyStatus, PipelineError},
};

/// Plain-text body listing every alert line of one row.
pub fn compose_body(lines: &[AlertLine]) -> String {
    let listed: Vec<String> = lines.iter().map(ToString::to_string).collect();
    format!("Anomalies Detected:\n\n{}", listed.join("\n"))
}

/// Sends one email per anomalous row through an authenticated STARTTLS relay.
///
/// Delivery is attempted once. Failures come back to the caller as
/// `PipelineError::Notify`; nothing is queued or retried.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
}

impl EmailNotifier {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, PipelineError> {
        let from: Mailbox = cfg
            .from
            .parse()
            .map_err(|e| PipelineError::Config(format!("invalid smtp.from '{}': {e}", cfg.from)))?;
        let to: Mailbox = cfg
            .to
            .parse()
            .map_err(|e| PipelineError::Config(format!("invalid smtp.to '{}': {e}", cfg.to)))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.relay)
            .map_err(|e| PipelineError::Config(format!("invalid smtp.relay '{}': {e}", cfg.relay)))?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();

        Ok(Self {
            mailer,
            from,
            to,
            subject: cfg.subject.clone(),
        })
    }

    fn compose(&self, lines: &[AlertLine]) -> Result<Message, PipelineError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(compose_body(lines))
            .map_err(|e| PipelineError::Notify(format!("failed to build alert email: {e}")))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, lines: &[AlertLine]) -> Result<NotifyStatus, PipelineError> {
        if lines.is_empty() {
            return Ok(NotifyStatus::Skipped);
        }

        let message = self.compose(lines)?;
        match self.mailer.send(message).await {
            Ok(_) => {
                metrics::counter!("alert_email_sent_total").increment(1);
                tracing::debug!(lines = lines.len(), to = %self.to, "alert email sent");
                Ok(NotifyStatus::Sent)
            }
            Err(e) => {
                metrics::counter!("alert_email_errors_total").increment(1);
                Err(PipelineError::Notify(format!("email delivery failed: {e}")))
            }
        }
    }
}

/// Notifier used when email alerting is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait::async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _lines: &[AlertLine]) -> Result<NotifyStatus, PipelineError> {
        Ok(NotifyStatus::Skipped)
    }
}
