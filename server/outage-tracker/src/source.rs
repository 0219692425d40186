//! Raw record feeds: maintenance emails and log-detected outages.
//!
//! Each call returns a finite, single-use iterator over the records newer
//! than the given watermark, oldest first.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::TrackerError;
use crate::types::{LogRecord, RawEmail, Timestamped};

/// Lazily produced records; an `Err` item aborts the consumer.
pub type Records<'a, T> = Box<dyn Iterator<Item = Result<T, TrackerError>> + 'a>;

pub trait EmailSource {
  /// Emails received strictly after `since`.
  fn load_new_emails(&mut self, since: DateTime<Utc>) -> Result<Records<'_, RawEmail>, TrackerError>;
}

pub trait LogSource {
  /// Outages logged strictly after `since`.
  fn load_outages_from_logs(
    &mut self,
    since: DateTime<Utc>,
  ) -> Result<Records<'_, LogRecord>, TrackerError>;
}

impl<T: EmailSource + ?Sized> EmailSource for Box<T> {
  fn load_new_emails(&mut self, since: DateTime<Utc>) -> Result<Records<'_, RawEmail>, TrackerError> {
    (**self).load_new_emails(since)
  }
}

impl<T: LogSource + ?Sized> LogSource for Box<T> {
  fn load_outages_from_logs(
    &mut self,
    since: DateTime<Utc>,
  ) -> Result<Records<'_, LogRecord>, TrackerError> {
    (**self).load_outages_from_logs(since)
  }
}

// ---------------------------------------------------------------------------
// JSON-lines spool file
// ---------------------------------------------------------------------------

/// One JSON record per line, appended by an external fetcher. A missing file
/// reads as empty; blank lines are skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesSource<T> {
  path: PathBuf,
  _record: PhantomData<fn() -> T>,
}

impl<T> JsonLinesSource<T>
where
  T: DeserializeOwned + Timestamped + 'static,
{
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      _record: PhantomData,
    }
  }

  fn records_after(&self, since: DateTime<Utc>) -> Result<Records<'static, T>, TrackerError> {
    let file = match File::open(&self.path) {
      Ok(f) => f,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "spool missing; nothing to load");
        return Ok(Box::new(std::iter::empty()));
      }
      Err(e) => return Err(e.into()),
    };
    let path = self.path.clone();

    let iter = BufReader::new(file)
      .lines()
      .enumerate()
      .filter_map(move |(idx, line)| {
        let line = match line {
          Ok(l) => l,
          Err(e) => return Some(Err(TrackerError::from(e))),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
          return None;
        }
        match serde_json::from_str::<T>(trimmed) {
          Ok(record) if record.timestamp() > since => Some(Ok(record)),
          Ok(_) => None,
          Err(e) => Some(Err(TrackerError::spool(&path, idx + 1, e.to_string()))),
        }
      });
    Ok(Box::new(iter))
  }
}

impl EmailSource for JsonLinesSource<RawEmail> {
  fn load_new_emails(&mut self, since: DateTime<Utc>) -> Result<Records<'_, RawEmail>, TrackerError> {
    self.records_after(since)
  }
}

impl LogSource for JsonLinesSource<LogRecord> {
  fn load_outages_from_logs(
    &mut self,
    since: DateTime<Utc>,
  ) -> Result<Records<'_, LogRecord>, TrackerError> {
    self.records_after(since)
  }
}

// ---------------------------------------------------------------------------
// In-memory replay
// ---------------------------------------------------------------------------

/// Fixed set of records served by timestamp; used for demos and tests.
#[derive(Debug, Clone)]
pub struct Replay<T> {
  records: Vec<T>,
}

impl<T> Default for Replay<T> {
  fn default() -> Self {
    Self {
      records: Vec::new(),
    }
  }
}

impl<T: Timestamped + Clone> Replay<T> {
  pub fn new(mut records: Vec<T>) -> Self {
    records.sort_by_key(|r| r.timestamp());
    Self { records }
  }

  /// Make a record available to the next load.
  pub fn push(&mut self, record: T) {
    self.records.push(record);
    self.records.sort_by_key(|r| r.timestamp());
  }

  fn records_after(&self, since: DateTime<Utc>) -> Records<'_, T> {
    Box::new(
      self
        .records
        .iter()
        .filter(move |r| r.timestamp() > since)
        .cloned()
        .map(Ok),
    )
  }
}

impl EmailSource for Replay<RawEmail> {
  fn load_new_emails(&mut self, since: DateTime<Utc>) -> Result<Records<'_, RawEmail>, TrackerError> {
    Ok(self.records_after(since))
  }
}

impl LogSource for Replay<LogRecord> {
  fn load_outages_from_logs(
    &mut self,
    since: DateTime<Utc>,
  ) -> Result<Records<'_, LogRecord>, TrackerError> {
    Ok(self.records_after(since))
  }
}
