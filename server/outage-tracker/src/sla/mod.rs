//! SLA dispatch: route each new unscheduled outage to its provider's handler.
//!
//! The dispatcher only routes. Whether an outage breaches an SLA, and what
//! to do about it (alert, log, escalate), is up to the handler.

mod fiberprovider;

pub use fiberprovider::FiberProviderHandler;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{HandlerError, TrackerError};
use crate::registry;
use crate::store::Store;
use crate::types::{DeviceOrCircuit, UnscheduledOutage};

/// What a handler is given: the outage and the identity it was resolved to.
#[derive(Debug, Clone, Copy)]
pub struct Violation<'a> {
  pub outage: &'a UnscheduledOutage,
  pub device_or_circuit: &'a DeviceOrCircuit,
}

impl Violation<'_> {
  pub fn provider(&self) -> &str {
    &self.device_or_circuit.provider
  }
}

pub trait SlaHandler {
  fn handle(&self, violation: &Violation<'_>) -> Result<(), HandlerError>;
}

impl<F> SlaHandler for F
where
  F: Fn(&Violation<'_>) -> Result<(), HandlerError>,
{
  fn handle(&self, violation: &Violation<'_>) -> Result<(), HandlerError> {
    self(violation)
  }
}

/// Handlers keyed by provider.
#[derive(Default)]
pub struct SlaDispatcher {
  handlers: HashMap<String, Box<dyn SlaHandler>>,
}

impl SlaDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Dispatcher with every handler shipped in this crate.
  pub fn builtin() -> Self {
    let mut dispatcher = Self::new();
    dispatcher.register(FiberProviderHandler::PROVIDER, FiberProviderHandler);
    dispatcher
  }

  pub fn register(&mut self, provider: &str, handler: impl SlaHandler + 'static) {
    if self
      .handlers
      .insert(provider.to_string(), Box::new(handler))
      .is_some()
    {
      warn!(provider, "SLA handler replaced");
    } else {
      debug!(provider, "SLA handler registered");
    }
  }

  /// Register a closure; its signature is checked against the handler shape.
  pub fn register_fn<F>(&mut self, provider: &str, handler: F)
  where
    F: Fn(&Violation<'_>) -> Result<(), HandlerError> + 'static,
  {
    self.register(provider, handler);
  }

  pub fn contains(&self, provider: &str) -> bool {
    self.handlers.contains_key(provider)
  }

  /// Resolve the outage's provider and hand it to that provider's handler.
  /// Failures are returned as-is; nothing is retried.
  pub fn dispatch<S: Store + ?Sized>(
    &self,
    store: &S,
    outage: &UnscheduledOutage,
  ) -> Result<(), TrackerError> {
    let identity = registry::identity_of(store, outage.device_or_circuit_id)?
      .ok_or(TrackerError::UnresolvedIdentity {
        outage_id: outage.id,
      })?;
    let handler = self
      .handlers
      .get(&identity.provider)
      .ok_or_else(|| TrackerError::NoHandlerRegistered {
        provider: identity.provider.clone(),
      })?;

    debug!(provider = %identity.provider, outage_id = outage.id, "dispatching");
    handler
      .handle(&Violation {
        outage,
        device_or_circuit: &identity,
      })
      .map_err(|source| TrackerError::Handler {
        provider: identity.provider.clone(),
        source,
      })
  }
}

impl std::fmt::Debug for SlaDispatcher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut keys: Vec<_> = self.handlers.keys().collect();
    keys.sort();
    f.debug_struct("SlaDispatcher").field("providers", &keys).finish()
  }
}
