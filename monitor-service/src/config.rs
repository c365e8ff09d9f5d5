use meter_model::AnomalyThresholds;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceChoice {
    Real,
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub choice: SourceChoice,
    pub real_path: PathBuf,
    pub simulated_path: PathBuf,
}

impl SourceConfig {
    pub fn selected_path(&self) -> &Path {
        match self.choice {
            SourceChoice::Real => &self.real_path,
            SourceChoice::Simulated => &self.simulated_path,
        }
    }

    /// An explicit path replaces the configured real/simulated source.
    pub fn resolve_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit.unwrap_or_else(|| self.selected_path().to_path_buf())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub refresh_interval_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub relay: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    "Smart Meter Anomaly Alert".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    pub log_dir: PathBuf,
    pub email_enabled: bool,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub input_days: usize,
    pub horizon_days: usize,
    pub alpha: f64,
    pub kwh_column: String,
    pub kvah_column: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            input_days: 14,
            horizon_days: 7,
            alpha: 0.3,
            kwh_column: "kWh".to_string(),
            kvah_column: "kVAh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub replay: ReplayConfig,
    #[serde(default)]
    pub thresholds: AnomalyThresholds,
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("METER_MONITOR_CONFIG").unwrap_or_else(|_| "meter-monitor.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        let mut cfg = Self::from_toml_str(&contents)?;
        cfg.apply_env_overrides(env::var("METER_MONITOR_SMTP_PASSWORD").ok());
        Ok(cfg)
    }

    /// Replace the SMTP password from the file, if an `[alerts.smtp]` table exists.
    pub fn apply_env_overrides(&mut self, smtp_password: Option<String>) {
        if let (Some(password), Some(smtp)) = (smtp_password, self.alerts.smtp.as_mut()) {
            smtp.password = password;
        }
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.thresholds
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [thresholds]: {e}"))?;
        if self.alerts.email_enabled && self.alerts.smtp.is_none() {
            anyhow::bail!("alerts.email_enabled is set but [alerts.smtp] is missing");
        }
        if self.forecast.input_days == 0 || self.forecast.horizon_days == 0 {
            anyhow::bail!("forecast.input_days and forecast.horizon_days must be positive");
        }
        Ok(())
    }
}
