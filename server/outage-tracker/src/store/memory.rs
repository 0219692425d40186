//! In-memory store with snapshot rollback and optional JSON persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Store;
use crate::error::StoreError;
use crate::types::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Tables {
  next_id: i64,
  devices_or_circuits: Vec<DeviceOrCircuit>,
  device_circuits: Vec<DeviceCircuitLink>,
  /// Keyed by [`Channel::as_str`].
  watermarks: BTreeMap<String, DateTime<Utc>>,
  scheduled_outages: Vec<ScheduledOutage>,
  detected_outages: Vec<DetectedOutage>,
  unscheduled_outages: Vec<UnscheduledOutage>,
}

impl Tables {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }
}

/// [`Store`] backed by plain vectors.
///
/// A transaction snapshots the tables on `begin` and restores them on
/// `rollback`. With a snapshot path, every commit (and every write made
/// outside a transaction) rewrites the JSON file, so watermarks and outages
/// survive a restart. A write that cannot be persisted is undone in memory
/// too.
#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: Tables,
  saved: Option<Tables>,
  path: Option<PathBuf>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load the snapshot at `path` (empty store if the file does not exist).
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref();
    let tables = match fs::read(path) {
      Ok(bytes) => serde_json::from_slice(&bytes)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
      Err(e) => return Err(StoreError::io(path, e)),
    };
    info!(
      path = %path.display(),
      devices_or_circuits = tables.devices_or_circuits.len(),
      scheduled = tables.scheduled_outages.len(),
      "store opened"
    );
    Ok(Self {
      tables,
      saved: None,
      path: Some(path.to_path_buf()),
    })
  }

  fn persist(&self) -> Result<(), StoreError> {
    let Some(path) = &self.path else {
      return Ok(());
    };
    let json = serde_json::to_vec_pretty(&self.tables)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    debug!(path = %path.display(), "snapshot written");
    Ok(())
  }

  /// Apply `change` to the tables. Outside a transaction the change is
  /// persisted right away and reverted if the snapshot write fails.
  fn apply<T>(&mut self, change: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
    if self.saved.is_some() || self.path.is_none() {
      return Ok(change(&mut self.tables));
    }
    let before = self.tables.clone();
    let out = change(&mut self.tables);
    if let Err(e) = self.persist() {
      self.tables = before;
      return Err(e);
    }
    Ok(out)
  }

  // -------------------------------------------------------------------------
  // Provisioning
  // -------------------------------------------------------------------------

  pub fn add_device_or_circuit(
    &mut self,
    provider: &str,
    service_id: &str,
    kind: Kind,
    comment: Option<&str>,
  ) -> Result<DeviceOrCircuit, StoreError> {
    if self.find_device_or_circuit(provider, service_id)?.is_some() {
      return Err(StoreError::Conflict(format!(
        "device/circuit {}:{} already exists",
        provider, service_id
      )));
    }
    self.apply(|t| {
      let row = DeviceOrCircuit {
        id: t.next_id(),
        provider: provider.to_string(),
        service_id: service_id.to_string(),
        kind,
        comment: comment.map(str::to_string),
      };
      t.devices_or_circuits.push(row.clone());
      row
    })
  }

  /// Record that `circuit_id` runs over `device_id`. Linking twice is a no-op.
  pub fn link_device_circuit(&mut self, device_id: i64, circuit_id: i64) -> Result<(), StoreError> {
    for (id, expected) in [(device_id, Kind::Device), (circuit_id, Kind::Circuit)] {
      match self.device_or_circuit(id)? {
        Some(row) if row.kind == expected => {}
        Some(row) => {
          return Err(StoreError::Conflict(format!(
            "{} is a {:?}, expected {:?}",
            id, row.kind, expected
          )))
        }
        None => return Err(StoreError::NotFound(format!("device/circuit {}", id))),
      }
    }
    let link = DeviceCircuitLink {
      device_id,
      circuit_id,
    };
    if !self.tables.device_circuits.contains(&link) {
      self.apply(|t| t.device_circuits.push(link))?;
    }
    Ok(())
  }

  /// Delete an identity. Outages keep their rows with the reference set to
  /// null; links through the identity are removed.
  pub fn remove_device_or_circuit(&mut self, id: i64) -> Result<bool, StoreError> {
    if !self.tables.devices_or_circuits.iter().any(|d| d.id == id) {
      return Ok(false);
    }

    self.apply(|t| {
      t.devices_or_circuits.retain(|d| d.id != id);
      let clear = |slot: &mut Option<i64>| {
        if *slot == Some(id) {
          *slot = None;
        }
      };
      for o in &mut t.scheduled_outages {
        clear(&mut o.device_or_circuit_id);
      }
      for o in &mut t.detected_outages {
        clear(&mut o.device_or_circuit_id);
      }
      for o in &mut t.unscheduled_outages {
        clear(&mut o.device_or_circuit_id);
      }
      t.device_circuits.retain(|l| l.device_id != id && l.circuit_id != id);
    })?;
    Ok(true)
  }

  // -------------------------------------------------------------------------
  // Read accessors
  // -------------------------------------------------------------------------

  pub fn devices_or_circuits(&self) -> &[DeviceOrCircuit] {
    &self.tables.devices_or_circuits
  }

  pub fn links(&self) -> &[DeviceCircuitLink] {
    &self.tables.device_circuits
  }

  pub fn scheduled_outages(&self) -> &[ScheduledOutage] {
    &self.tables.scheduled_outages
  }

  pub fn detected_outages(&self) -> &[DetectedOutage] {
    &self.tables.detected_outages
  }

  pub fn unscheduled_outages(&self) -> &[UnscheduledOutage] {
    &self.tables.unscheduled_outages
  }
}

impl Store for MemoryStore {
  fn watermark(&self, channel: Channel) -> Result<Option<DateTime<Utc>>, StoreError> {
    Ok(self.tables.watermarks.get(channel.as_str()).copied())
  }

  fn set_watermark(&mut self, channel: Channel, at: DateTime<Utc>) -> Result<(), StoreError> {
    self.apply(|t| {
      t.watermarks.insert(channel.as_str().to_string(), at);
    })
  }

  fn find_device_or_circuit(
    &self,
    provider: &str,
    service_id: &str,
  ) -> Result<Option<DeviceOrCircuit>, StoreError> {
    Ok(
      self
        .tables
        .devices_or_circuits
        .iter()
        .find(|d| d.provider == provider && d.service_id == service_id)
        .cloned(),
    )
  }

  fn device_or_circuit(&self, id: i64) -> Result<Option<DeviceOrCircuit>, StoreError> {
    Ok(
      self
        .tables
        .devices_or_circuits
        .iter()
        .find(|d| d.id == id)
        .cloned(),
    )
  }

  fn insert_scheduled(&mut self, new: NewScheduledOutage) -> Result<ScheduledOutage, StoreError> {
    let exists = self
      .tables
      .scheduled_outages
      .iter()
      .any(|o| o.provider == new.provider && o.outage_id == new.outage_id);
    if exists {
      return Err(StoreError::Conflict(format!(
        "scheduled outage {}:{} already exists",
        new.provider, new.outage_id
      )));
    }
    self.apply(|t| {
      let row = ScheduledOutage {
        id: t.next_id(),
        provider: new.provider,
        outage_id: new.outage_id,
        device_or_circuit_id: Some(new.device_or_circuit_id),
        begin_time: new.begin_time,
        end_time: new.end_time,
        payload: new.payload,
      };
      t.scheduled_outages.push(row.clone());
      row
    })
  }

  fn delete_scheduled(&mut self, provider: &str, outage_id: &str) -> Result<usize, StoreError> {
    let matches = |o: &ScheduledOutage| o.provider == provider && o.outage_id == outage_id;
    let removed = self.tables.scheduled_outages.iter().filter(|o| matches(o)).count();
    if removed > 0 {
      self.apply(|t| t.scheduled_outages.retain(|o| !matches(o)))?;
    }
    Ok(removed)
  }

  fn find_covering_scheduled(
    &self,
    provider: &str,
    device_or_circuit_id: i64,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Option<ScheduledOutage>, StoreError> {
    Ok(
      self
        .tables
        .scheduled_outages
        .iter()
        .find(|o| {
          o.provider == provider
            && o.device_or_circuit_id == Some(device_or_circuit_id)
            && o.begin_time <= begin
            && o.end_time >= end
        })
        .cloned(),
    )
  }

  fn insert_detected(&mut self, new: NewOutage) -> Result<DetectedOutage, StoreError> {
    self.apply(|t| {
      let row = DetectedOutage {
        id: t.next_id(),
        device_or_circuit_id: new.device_or_circuit_id,
        begin_time: new.begin_time,
        end_time: new.end_time,
        payload: new.payload,
      };
      t.detected_outages.push(row.clone());
      row
    })
  }

  fn insert_unscheduled(&mut self, new: NewOutage) -> Result<UnscheduledOutage, StoreError> {
    self.apply(|t| {
      let row = UnscheduledOutage {
        id: t.next_id(),
        device_or_circuit_id: new.device_or_circuit_id,
        begin_time: new.begin_time,
        end_time: new.end_time,
        payload: new.payload,
      };
      t.unscheduled_outages.push(row.clone());
      row
    })
  }

  fn begin(&mut self) -> Result<(), StoreError> {
    if self.saved.is_some() {
      return Err(StoreError::TransactionActive);
    }
    self.saved = Some(self.tables.clone());
    Ok(())
  }

  /// Persist the transaction. If the snapshot cannot be written the
  /// transaction is rolled back and the write error returned.
  fn commit(&mut self) -> Result<(), StoreError> {
    let Some(saved) = self.saved.take() else {
      return Err(StoreError::NoTransaction);
    };
    if let Err(e) = self.persist() {
      self.tables = saved;
      return Err(e);
    }
    Ok(())
  }

  fn rollback(&mut self) -> Result<(), StoreError> {
    match self.saved.take() {
      Some(tables) => {
        self.tables = tables;
        Ok(())
      }
      None => Err(StoreError::NoTransaction),
    }
  }
}
