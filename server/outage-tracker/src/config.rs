//! Tracker configuration with sane defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for the poll loop and its collaborators.
#[derive(Debug, Clone)]
pub struct Config {
  /// Seconds between poll cycles. 0 = run a single cycle and stop.
  pub poll_interval_secs: u64,
  /// JSON snapshot of the store. None = in-memory only.
  pub store_path: Option<PathBuf>,
  /// JSON-lines spool of raw maintenance emails.
  pub email_spool: Option<PathBuf>,
  /// JSON-lines spool of log-detected outages.
  pub log_spool: Option<PathBuf>,
}

impl Config {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      poll_interval_secs: 299,
      store_path: None,
      email_spool: None,
      log_spool: None,
    }
  }
}
