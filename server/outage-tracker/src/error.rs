//! Structured error types for the outage tracker.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Boxed error returned by SLA handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to turn a raw maintenance email into a notification.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("no parser registered for {source_key}")]
  NoParserRegistered { source_key: String },

  #[error("malformed notification from {source_key}: {reason}")]
  Malformed { source_key: String, reason: String },

  #[error("bad timestamp {value:?} from {source_key}: {reason}")]
  BadTimestamp {
    source_key: String,
    value: String,
    reason: String,
  },
}

impl ParseError {
  pub fn malformed(source_key: &str, reason: impl Into<String>) -> Self {
    Self::Malformed {
      source_key: source_key.to_string(),
      reason: reason.into(),
    }
  }

  pub fn bad_timestamp(source_key: &str, value: &str, reason: impl Into<String>) -> Self {
    Self::BadTimestamp {
      source_key: source_key.to_string(),
      value: value.to_string(),
      reason: reason.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("a transaction is already open")]
  TransactionActive,

  #[error("no open transaction")]
  NoTransaction,

  #[error("snapshot {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("snapshot json: {0}")]
  Json(#[from] serde_json::Error),
}

impl StoreError {
  pub fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Every error the pipeline can surface to the poll loop.
#[derive(Debug, Error)]
pub enum TrackerError {
  #[error("parse: {0}")]
  Parse(#[from] ParseError),

  #[error("store: {0}")]
  Store(#[from] StoreError),

  #[error("unknown device/circuit {provider}:{service_id}")]
  UnknownDeviceOrCircuit { provider: String, service_id: String },

  #[error("no SLA handler registered for {provider}")]
  NoHandlerRegistered { provider: String },

  #[error("unscheduled outage {outage_id} has no device/circuit; provider undefined")]
  UnresolvedIdentity { outage_id: i64 },

  #[error("SLA handler for {provider} failed: {source}")]
  Handler {
    provider: String,
    #[source]
    source: HandlerError,
  },

  #[error("source {path}:{line}: {reason}")]
  Source {
    path: PathBuf,
    line: usize,
    reason: String,
  },

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

impl TrackerError {
  pub fn unknown_device_or_circuit(provider: &str, service_id: &str) -> Self {
    Self::UnknownDeviceOrCircuit {
      provider: provider.to_string(),
      service_id: service_id.to_string(),
    }
  }

  pub fn spool(path: &Path, line: usize, reason: impl Into<String>) -> Self {
    Self::Source {
      path: path.to_path_buf(),
      line,
      reason: reason.into(),
    }
  }
}
