//! Outage Tracker: reconcile provider maintenance notices with log-detected
//! outages and route unscheduled ones to per-provider SLA handlers.
//!
//! Each poll cycle loads new maintenance emails (scheduled outages) and new
//! log-detected outages since the last watermark, marks every detected
//! outage that is not fully inside an announced window as unscheduled, and
//! dispatches those to the provider's handler.

pub mod config;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod parser;
pub mod poll;
pub mod registry;
pub mod sla;
pub mod source;
pub mod store;
pub mod types;
pub mod watermark;

pub use config::Config;
pub use error::{ParseError, StoreError, TrackerError};
pub use generator::UnscheduledOutageGenerator;
pub use ingest::Ingestor;
pub use parser::{MaintenanceParser, ParserRegistry};
pub use poll::{CycleReport, PollState, Tracker};
pub use sla::{SlaDispatcher, SlaHandler, Violation};
pub use source::{EmailSource, JsonLinesSource, LogSource, Replay};
pub use store::{MemoryStore, Store};
pub use types::*;
