use anyhow::{bail, Result};
use monitor_service::{
    config::AppConfig,
    forecast::{ForecastWindow, Forecaster, SmoothingForecaster},
    observability,
};
use std::env;

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: forecast_window <window_csv_path> [--json]");
    }
    let file_path = &args[1];
    let as_json = args.iter().skip(2).any(|a| a == "--json");

    let cfg = AppConfig::load()?.forecast;

    let window = ForecastWindow::from_csv(file_path, cfg.input_days)?;
    let forecaster = SmoothingForecaster::new(cfg.alpha, &cfg.kwh_column, &cfg.kvah_column)?;
    let forecast = forecaster.predict(&window, cfg.horizon_days)?;

    tracing::info!(
        input_days = window.days(),
        horizon_days = cfg.horizon_days,
        "forecast computed"
    );

    if as_json {
        println!("{}", serde_json::to_string_pretty(&forecast)?);
    } else {
        println!("{:<8} {:>14} {:>15}", "", "Predicted_kWh", "Predicted_kVAh");
        for day in &forecast.days {
            println!(
                "{:<8} {:>14.3} {:>15.3}",
                day.label, day.predicted_kwh, day.predicted_kvah
            );
        }
    }

    Ok(())
}
