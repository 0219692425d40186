//! Storage boundary: the tables the pipeline reads and writes.
//!
//! Everything persisted belongs to the store; the pipeline only holds copies
//! for the duration of one cycle. Mutations issued between [`Store::begin`]
//! and [`Store::commit`] form one atomic unit.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{StoreError, TrackerError};
use crate::types::*;

pub trait Store {
  // Watermarks

  fn watermark(&self, channel: Channel) -> Result<Option<DateTime<Utc>>, StoreError>;

  /// Upsert.
  fn set_watermark(&mut self, channel: Channel, at: DateTime<Utc>) -> Result<(), StoreError>;

  // Registry (read-only to the pipeline)

  fn find_device_or_circuit(
    &self,
    provider: &str,
    service_id: &str,
  ) -> Result<Option<DeviceOrCircuit>, StoreError>;

  fn device_or_circuit(&self, id: i64) -> Result<Option<DeviceOrCircuit>, StoreError>;

  // Scheduled outages

  /// Fails with [`StoreError::Conflict`] if `(provider, outage_id)` exists.
  fn insert_scheduled(&mut self, new: NewScheduledOutage) -> Result<ScheduledOutage, StoreError>;

  /// Returns the number of rows removed (0 or 1).
  fn delete_scheduled(&mut self, provider: &str, outage_id: &str) -> Result<usize, StoreError>;

  /// First scheduled outage for `provider`/`device_or_circuit_id` whose
  /// window contains `[begin, end]`.
  fn find_covering_scheduled(
    &self,
    provider: &str,
    device_or_circuit_id: i64,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Option<ScheduledOutage>, StoreError>;

  // Detected / unscheduled outages

  fn insert_detected(&mut self, new: NewOutage) -> Result<DetectedOutage, StoreError>;

  fn insert_unscheduled(&mut self, new: NewOutage) -> Result<UnscheduledOutage, StoreError>;

  // Transactions

  fn begin(&mut self) -> Result<(), StoreError>;

  fn commit(&mut self) -> Result<(), StoreError>;

  fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Run `f` as one atomic unit: commit on success, roll back on error.
pub fn transaction<S, T, F>(store: &mut S, f: F) -> Result<T, TrackerError>
where
  S: Store + ?Sized,
  F: FnOnce(&mut S) -> Result<T, TrackerError>,
{
  store.begin()?;
  match f(store) {
    Ok(value) => {
      store.commit()?;
      Ok(value)
    }
    Err(e) => {
      if let Err(rb) = store.rollback() {
        warn!(error = %rb, "rollback failed");
      }
      Err(e)
    }
  }
}
