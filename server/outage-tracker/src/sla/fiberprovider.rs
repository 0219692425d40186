use tracing::warn;

use super::{SlaHandler, Violation};
use crate::error::HandlerError;

/// Zero tolerance: every unscheduled outage is a violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiberProviderHandler;

impl FiberProviderHandler {
  pub const PROVIDER: &'static str = "fiberprovider";
}

impl SlaHandler for FiberProviderHandler {
  fn handle(&self, violation: &Violation<'_>) -> Result<(), HandlerError> {
    let outage = violation.outage;
    warn!(
      provider = violation.provider(),
      service_id = %violation.device_or_circuit.service_id,
      begin = %outage.begin_time.to_rfc3339(),
      end = %outage.end_time.to_rfc3339(),
      minutes = (outage.end_time - outage.begin_time).num_minutes(),
      "SLA violation"
    );
    Ok(())
  }
}
