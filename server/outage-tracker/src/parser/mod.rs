//! Maintenance email parsing, one parser per sender address.

mod fiberprovider;

pub use fiberprovider::FiberProviderParser;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::types::MaintenanceNotification;

/// Turns one provider's email format into a [`MaintenanceNotification`].
pub trait MaintenanceParser {
  fn parse(&self, source_key: &str, content: &str) -> Result<MaintenanceNotification, ParseError>;
}

impl<F> MaintenanceParser for F
where
  F: Fn(&str, &str) -> Result<MaintenanceNotification, ParseError>,
{
  fn parse(&self, source_key: &str, content: &str) -> Result<MaintenanceNotification, ParseError> {
    self(source_key, content)
  }
}

/// Parsers keyed by source (sender address).
#[derive(Default)]
pub struct ParserRegistry {
  parsers: HashMap<String, Box<dyn MaintenanceParser>>,
}

impl ParserRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with every parser shipped in this crate.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    registry.register(FiberProviderParser::SOURCE_KEY, FiberProviderParser);
    registry
  }

  pub fn register(&mut self, source_key: &str, parser: impl MaintenanceParser + 'static) {
    if self
      .parsers
      .insert(source_key.to_string(), Box::new(parser))
      .is_some()
    {
      warn!(source_key, "parser replaced");
    } else {
      debug!(source_key, "parser registered");
    }
  }

  pub fn contains(&self, source_key: &str) -> bool {
    self.parsers.contains_key(source_key)
  }

  pub fn parse(&self, source_key: &str, content: &str) -> Result<MaintenanceNotification, ParseError> {
    let parser = self
      .parsers
      .get(source_key)
      .ok_or_else(|| ParseError::NoParserRegistered {
        source_key: source_key.to_string(),
      })?;
    parser.parse(source_key, content)
  }
}

impl std::fmt::Debug for ParserRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut keys: Vec<_> = self.parsers.keys().collect();
    keys.sort();
    f.debug_struct("ParserRegistry").field("sources", &keys).finish()
  }
}
