//! Provider registry: resolve inbound `(provider, service_id)` pairs and the
//! provider behind a stored outage.

use crate::error::TrackerError;
use crate::store::Store;
use crate::types::DeviceOrCircuit;

/// Look up the identity an inbound record refers to.
pub fn resolve<S: Store + ?Sized>(
  store: &S,
  provider: &str,
  service_id: &str,
) -> Result<DeviceOrCircuit, TrackerError> {
  store
    .find_device_or_circuit(provider, service_id)?
    .ok_or_else(|| TrackerError::unknown_device_or_circuit(provider, service_id))
}

/// Identity (and with it the provider) of an outage row.
///
/// `None` when the row has no identity or the identity was deleted since.
pub fn identity_of<S: Store + ?Sized>(
  store: &S,
  device_or_circuit_id: Option<i64>,
) -> Result<Option<DeviceOrCircuit>, TrackerError> {
  match device_or_circuit_id {
    Some(id) => Ok(store.device_or_circuit(id)?),
    None => Ok(None),
  }
}
