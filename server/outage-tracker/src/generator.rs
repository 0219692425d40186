//! Decide which detected outages were announced and materialize the rest
//! as unscheduled outages.

use tracing::{debug, info};

use crate::error::TrackerError;
use crate::registry;
use crate::store::{transaction, Store};
use crate::types::*;

/// Outages that stick out of their maintenance window by any amount count
/// as entirely unscheduled. A scheduled outage on a device is not matched
/// against detected outages of the circuits running over it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnscheduledOutageGenerator;

impl UnscheduledOutageGenerator {
  pub fn new() -> Self {
    Self
  }

  /// Create an unscheduled outage for every uncovered detected outage and
  /// return the new rows, in input order.
  pub fn add_if_needed<S: Store + ?Sized>(
    &self,
    store: &mut S,
    detected: &[DetectedOutage],
  ) -> Result<Vec<UnscheduledOutage>, TrackerError> {
    let mut created = Vec::new();
    for outage in detected {
      if self.is_scheduled(store, outage)? {
        debug!(detected_id = outage.id, "outage covered by maintenance window");
        continue;
      }
      let unscheduled = transaction(store, |tx| Ok(tx.insert_unscheduled(NewOutage::from(outage))?))?;
      info!(
        detected_id = outage.id,
        unscheduled_id = unscheduled.id,
        begin = %unscheduled.begin_time,
        end = %unscheduled.end_time,
        "unscheduled outage"
      );
      created.push(unscheduled);
    }
    Ok(created)
  }

  /// True if a scheduled outage for the same provider and device/circuit
  /// fully contains `outage`. Without an identity nothing can cover it.
  pub fn is_scheduled<S: Store + ?Sized>(
    &self,
    store: &S,
    outage: &DetectedOutage,
  ) -> Result<bool, TrackerError> {
    let Some(identity) = registry::identity_of(store, outage.device_or_circuit_id)? else {
      return Ok(false);
    };
    let covering = store.find_covering_scheduled(
      &identity.provider,
      identity.id,
      outage.begin_time,
      outage.end_time,
    )?;
    Ok(covering.is_some())
  }
}
