use chrono::Local;
use log::{max_level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::Write;

static LOGGER: StdLogger = StdLogger;

/// Line-per-record logger on stdout, which is what the Lambda runtime ships to CloudWatch.
pub struct StdLogger;

impl log::Log for StdLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= max_level()
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      let time_str = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
      println!("{0} {1:<8}: {2}", time_str, record.level(), record.args())
    }
  }

  fn flush(&self) {
    let _ = std::io::stdout().flush();
  }
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  log::set_logger(&LOGGER)?;
  log::set_max_level(level);
  Ok(())
}
