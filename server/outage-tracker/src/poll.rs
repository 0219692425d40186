//! Poll loop: ingest → generate → dispatch, at a fixed interval.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::TrackerError;
use crate::generator::UnscheduledOutageGenerator;
use crate::ingest::Ingestor;
use crate::parser::ParserRegistry;
use crate::sla::SlaDispatcher;
use crate::source::{EmailSource, LogSource};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
  Idle,
  RunningCycle,
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
  pub emails_processed: bool,
  pub detected: usize,
  pub unscheduled: usize,
  pub dispatched: usize,
}

/// Owns the store, both sources and both plugin registries for the life of
/// the process.
pub struct Tracker<S, E, L> {
  store: S,
  emails: E,
  logs: L,
  parsers: ParserRegistry,
  dispatcher: SlaDispatcher,
  generator: UnscheduledOutageGenerator,
  state: PollState,
  cycles: u64,
}

impl<S, E, L> Tracker<S, E, L>
where
  S: Store,
  E: EmailSource,
  L: LogSource,
{
  pub fn new(store: S, emails: E, logs: L, parsers: ParserRegistry, dispatcher: SlaDispatcher) -> Self {
    Self {
      store,
      emails,
      logs,
      parsers,
      dispatcher,
      generator: UnscheduledOutageGenerator::new(),
      state: PollState::Idle,
      cycles: 0,
    }
  }

  pub fn state(&self) -> PollState {
    self.state
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn emails_mut(&mut self) -> &mut E {
    &mut self.emails
  }

  pub fn logs_mut(&mut self) -> &mut L {
    &mut self.logs
  }

  /// One pass of the pipeline. The first error stops the pass and is
  /// returned unchanged.
  pub fn run_cycle(&mut self) -> Result<CycleReport, TrackerError> {
    self.state = PollState::RunningCycle;
    self.cycles += 1;
    debug!(cycle = self.cycles, "cycle started");
    let result = self.cycle();
    self.state = PollState::Idle;
    result
  }

  fn cycle(&mut self) -> Result<CycleReport, TrackerError> {
    let ingestor = Ingestor::new(&self.parsers);
    let emails_processed = ingestor.load_new_scheduled_outages(&mut self.store, &mut self.emails)?;
    let detected = ingestor.load_new_detected_outages(&mut self.store, &mut self.logs)?;

    let mut report = CycleReport {
      emails_processed,
      detected: detected.len(),
      ..CycleReport::default()
    };
    if detected.is_empty() {
      return Ok(report);
    }

    let unscheduled = self.generator.add_if_needed(&mut self.store, &detected)?;
    report.unscheduled = unscheduled.len();
    for outage in &unscheduled {
      self.dispatcher.dispatch(&self.store, outage)?;
      report.dispatched += 1;
    }
    Ok(report)
  }

  /// Run cycles until one fails. A zero interval runs exactly one cycle.
  pub async fn run(&mut self, poll_interval: Duration) -> Result<(), TrackerError> {
    loop {
      let report = self.run_cycle()?;
      info!(
        cycle = self.cycles,
        emails_processed = report.emails_processed,
        detected = report.detected,
        unscheduled = report.unscheduled,
        dispatched = report.dispatched,
        "cycle finished"
      );

      if poll_interval.is_zero() {
        return Ok(());
      }
      tokio::time::sleep(poll_interval).await;
    }
  }
}
