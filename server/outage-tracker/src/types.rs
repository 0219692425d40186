//! Core types for the outage tracker (persisted entities + source records).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra outage/notification data, stored as a JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Device / circuit registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
  Device,
  Circuit,
}

/// A provider-supplied device or circuit. `(provider, service_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOrCircuit {
  pub id: i64,
  pub provider: String,
  pub service_id: String,
  pub kind: Kind,
  #[serde(default)]
  pub comment: Option<String>,
}

/// Which circuits run over which devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCircuitLink {
  pub device_id: i64,
  pub circuit_id: i64,
}

// ---------------------------------------------------------------------------
// Watermarks
// ---------------------------------------------------------------------------

/// Ingestion channel a watermark belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  Email,
  Log,
}

impl Channel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Email => "email",
      Self::Log => "log",
    }
  }
}

impl std::fmt::Display for Channel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Outages
// ---------------------------------------------------------------------------

/// Announced maintenance window. `(provider, outage_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOutage {
  pub id: i64,
  pub provider: String,
  pub outage_id: String,
  pub device_or_circuit_id: Option<i64>,
  pub begin_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  #[serde(default)]
  pub payload: Payload,
}

/// Outage inferred from log data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedOutage {
  pub id: i64,
  pub device_or_circuit_id: Option<i64>,
  pub begin_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  #[serde(default)]
  pub payload: Payload,
}

/// Detected outage not covered by any scheduled window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledOutage {
  pub id: i64,
  pub device_or_circuit_id: Option<i64>,
  pub begin_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  #[serde(default)]
  pub payload: Payload,
}

/// Insert form of a scheduled outage (id assigned by the store).
#[derive(Debug, Clone)]
pub struct NewScheduledOutage {
  pub provider: String,
  pub outage_id: String,
  pub device_or_circuit_id: i64,
  pub begin_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub payload: Payload,
}

/// Insert form shared by detected and unscheduled outages.
#[derive(Debug, Clone)]
pub struct NewOutage {
  pub device_or_circuit_id: Option<i64>,
  pub begin_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub payload: Payload,
}

impl From<&DetectedOutage> for NewOutage {
  fn from(d: &DetectedOutage) -> Self {
    Self {
      device_or_circuit_id: d.device_or_circuit_id,
      begin_time: d.begin_time,
      end_time: d.end_time,
      payload: d.payload.clone(),
    }
  }
}

// ---------------------------------------------------------------------------
// Maintenance notifications (transient)
// ---------------------------------------------------------------------------

/// Structured maintenance email, produced by a parser and applied at once.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceNotification {
  pub provider: String,
  /// When present, a scheduled outage with this id is created.
  pub create_id: Option<String>,
  /// When present, the scheduled outage with this id is removed.
  pub cancel_id: Option<String>,
  pub service_id: String,
  pub begin: DateTime<Utc>,
  pub end: DateTime<Utc>,
  pub subject: String,
  pub action_reason: String,
  pub location: String,
  pub impact: String,
  pub contact_email: String,
  pub contact_phone: String,
}

impl MaintenanceNotification {
  /// Payload stored alongside the scheduled outage.
  pub fn payload(&self) -> Payload {
    let mut payload = Payload::new();
    for (key, value) in [
      ("Subject", &self.subject),
      ("ActionReason", &self.action_reason),
      ("Location", &self.location),
      ("Impact", &self.impact),
      ("Email", &self.contact_email),
      ("Phone", &self.contact_phone),
    ] {
      payload.insert(key.to_string(), value.clone().into());
    }
    payload
  }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// Records that carry the time they were produced at the source.
pub trait Timestamped {
  fn timestamp(&self) -> DateTime<Utc>;
}

/// One raw email from the helpdesk feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEmail {
  pub received_at: DateTime<Utc>,
  /// Sender address; selects the parser.
  pub source_key: String,
  pub content: String,
}

impl Timestamped for RawEmail {
  fn timestamp(&self) -> DateTime<Utc> {
    self.received_at
  }
}

/// Outage as reported by the log scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOutage {
  pub provider: String,
  pub service_id: String,
  pub begin: DateTime<Utc>,
  pub end: DateTime<Utc>,
  #[serde(default)]
  pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
  pub logged_at: DateTime<Utc>,
  pub outage: LogOutage,
}

impl Timestamped for LogRecord {
  fn timestamp(&self) -> DateTime<Utc> {
    self.logged_at
  }
}
