pub mod daily_log;
pub mod email;

pub use daily_log::DailyLogSink;
pub use email::{DisabledNotifier, EmailNotifier};
