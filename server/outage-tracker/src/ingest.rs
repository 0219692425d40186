//! Incremental loading of scheduled (email) and detected (log) outages.
//!
//! Each record is applied in its own transaction together with the advance
//! of its channel's watermark, so a restart resumes right after the last
//! committed record.

use tracing::{debug, info};

use crate::error::TrackerError;
use crate::parser::ParserRegistry;
use crate::registry;
use crate::source::{EmailSource, LogSource};
use crate::store::{transaction, Store};
use crate::types::*;
use crate::watermark;

pub struct Ingestor<'a> {
  parsers: &'a ParserRegistry,
}

impl<'a> Ingestor<'a> {
  pub fn new(parsers: &'a ParserRegistry) -> Self {
    Self { parsers }
  }

  /// Apply every new maintenance email.
  ///
  /// Returns `true` if at least one email was processed. A parse failure
  /// aborts before anything is written for that email.
  pub fn load_new_scheduled_outages<S: Store + ?Sized>(
    &self,
    store: &mut S,
    emails: &mut dyn EmailSource,
  ) -> Result<bool, TrackerError> {
    let since = watermark::load_or_init(store, Channel::Email)?;
    let mut processed = 0usize;

    for email in emails.load_new_emails(since)? {
      let email = email?;
      let notification = self.parsers.parse(&email.source_key, &email.content)?;

      transaction(store, |tx| {
        apply_notification(tx, &notification)?;
        watermark::advance(tx, Channel::Email, email.received_at)
      })?;
      processed += 1;
    }

    if processed > 0 {
      info!(processed, "maintenance emails applied");
    }
    Ok(processed > 0)
  }

  /// Store every new log-detected outage and return them in load order.
  pub fn load_new_detected_outages<S: Store + ?Sized>(
    &self,
    store: &mut S,
    logs: &mut dyn LogSource,
  ) -> Result<Vec<DetectedOutage>, TrackerError> {
    let since = watermark::load_or_init(store, Channel::Log)?;
    let mut created = Vec::new();

    for record in logs.load_outages_from_logs(since)? {
      let record = record?;
      let detected = transaction(store, |tx| {
        let detected = create_detected_outage(tx, &record.outage)?;
        watermark::advance(tx, Channel::Log, record.logged_at)?;
        Ok(detected)
      })?;
      created.push(detected);
    }

    if !created.is_empty() {
      info!(count = created.len(), "detected outages loaded");
    }
    Ok(created)
  }
}

/// Cancel first, then create, so a notice that replaces an earlier one
/// leaves only the new window.
fn apply_notification<S: Store + ?Sized>(
  store: &mut S,
  n: &MaintenanceNotification,
) -> Result<(), TrackerError> {
  if let Some(cancel_id) = &n.cancel_id {
    let removed = store.delete_scheduled(&n.provider, cancel_id)?;
    debug!(provider = %n.provider, %cancel_id, removed, "scheduled outage cancelled");
  }
  if let Some(create_id) = &n.create_id {
    let identity = registry::resolve(store, &n.provider, &n.service_id)?;
    let outage = store.insert_scheduled(NewScheduledOutage {
      provider: n.provider.clone(),
      outage_id: create_id.clone(),
      device_or_circuit_id: identity.id,
      begin_time: n.begin,
      end_time: n.end,
      payload: n.payload(),
    })?;
    debug!(
      provider = %outage.provider,
      outage_id = %outage.outage_id,
      begin = %outage.begin_time,
      end = %outage.end_time,
      "scheduled outage created"
    );
  }
  Ok(())
}

fn create_detected_outage<S: Store + ?Sized>(
  store: &mut S,
  outage: &LogOutage,
) -> Result<DetectedOutage, TrackerError> {
  let identity = registry::resolve(store, &outage.provider, &outage.service_id)?;
  let detected = store.insert_detected(NewOutage {
    device_or_circuit_id: Some(identity.id),
    begin_time: outage.begin,
    end_time: outage.end,
    payload: outage.payload.clone(),
  })?;
  debug!(
    provider = %identity.provider,
    service_id = %identity.service_id,
    begin = %detected.begin_time,
    end = %detected.end_time,
    "detected outage stored"
  );
  Ok(detected)
}
