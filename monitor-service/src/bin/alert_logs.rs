use anyhow::{bail, Result};
use monitor_service::{config::AppConfig, observability, sinks::DailyLogSink};
use std::env;

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    let cfg = AppConfig::load()?;
    let sink = DailyLogSink::new(&cfg.alerts.log_dir);

    match args.get(1).map(String::as_str) {
        Some("list") => {
            let logs = sink.list_logs()?;
            if logs.is_empty() {
                println!("No logs found in {}", sink.dir().display());
            }
            for id in logs {
                println!("{id}");
            }
        }
        Some("show") => {
            let id = match args.get(2) {
                Some(id) => id.clone(),
                // Without an id, show the most recent log.
                None => match sink.list_logs()?.into_iter().next() {
                    Some(id) => id,
                    None => bail!("no logs found in {}", sink.dir().display()),
                },
            };
            print!("{}", sink.read_log(&id)?);
        }
        _ => bail!("usage: alert_logs list | alert_logs show [<log_id>]"),
    }

    Ok(())
}
