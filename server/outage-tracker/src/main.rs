//! Binary entrypoint: poll the email and log spools, reconcile outages, and
//! dispatch unscheduled ones to SLA handlers.
//!
//! Exits non-zero on the first pipeline error; an external supervisor is
//! expected to restart it.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use outage_tracker::{
  Config, EmailSource, JsonLinesSource, LogRecord, LogSource, MemoryStore, ParserRegistry, RawEmail,
  Replay, SlaDispatcher, Tracker, TrackerError,
};

#[derive(Debug, Parser)]
#[command(name = "outage-tracker", version, about = "Track unscheduled provider outages against SLAs")]
struct Args {
  /// Poll interval in seconds (0 = run one cycle and exit)
  #[arg(short, long, default_value_t = Config::default().poll_interval_secs)]
  poll_interval: u64,

  /// JSON snapshot holding the device/circuit registry, outages and watermarks
  #[arg(long, env = "OUTAGE_TRACKER_STORE")]
  store: Option<PathBuf>,

  /// JSON-lines spool of raw maintenance emails
  #[arg(long, env = "OUTAGE_TRACKER_EMAILS")]
  emails: Option<PathBuf>,

  /// JSON-lines spool of log-detected outages
  #[arg(long, env = "OUTAGE_TRACKER_LOGS")]
  logs: Option<PathBuf>,

  /// Debug logging
  #[arg(short, long, conflicts_with = "quiet")]
  verbose: bool,

  /// Errors only
  #[arg(short, long)]
  quiet: bool,
}

impl Args {
  fn config(&self) -> Config {
    Config {
      poll_interval_secs: self.poll_interval,
      store_path: self.store.clone(),
      email_spool: self.emails.clone(),
      log_spool: self.logs.clone(),
    }
  }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
  let args = Args::parse();
  let rust_log = std::env::var("RUST_LOG").ok();
  init_logging(log_filter(args.verbose, args.quiet, rust_log.as_deref()));

  if let Err(e) = run(args.config()).await {
    error!(error = %e, "outage-tracker stopped");
    std::process::exit(1);
  }
}

async fn run(config: Config) -> Result<(), TrackerError> {
  let store = match &config.store_path {
    Some(path) => MemoryStore::open(path)?,
    None => MemoryStore::new(),
  };
  let emails: Box<dyn EmailSource> = match &config.email_spool {
    Some(path) => Box::new(JsonLinesSource::<RawEmail>::new(path)),
    None => Box::new(Replay::<RawEmail>::default()),
  };
  let logs: Box<dyn LogSource> = match &config.log_spool {
    Some(path) => Box::new(JsonLinesSource::<LogRecord>::new(path)),
    None => Box::new(Replay::<LogRecord>::default()),
  };

  let parsers = ParserRegistry::builtin();
  let dispatcher = SlaDispatcher::builtin();
  info!(?config, ?parsers, ?dispatcher, "outage-tracker starting");

  let mut tracker = Tracker::new(store, emails, logs, parsers, dispatcher);
  tokio::select! {
    result = tracker.run(config.poll_interval()) => result,
    signal = tokio::signal::ctrl_c() => interrupted(signal),
  }
}

/// Ctrl-C is a clean stop; failing to install the handler is not.
fn interrupted(signal: std::io::Result<()>) -> Result<(), TrackerError> {
  signal?;
  info!("interrupted; exiting");
  Ok(())
}

/// `-q` and `-v` win; otherwise `RUST_LOG` as given, or `info` when it is
/// unset or unparsable.
fn log_filter(verbose: bool, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
  if quiet {
    EnvFilter::new("error")
  } else if verbose {
    EnvFilter::new("debug")
  } else {
    rust_log
      .and_then(|directives| EnvFilter::try_new(directives).ok())
      .unwrap_or_else(|| EnvFilter::new("info"))
  }
}

fn init_logging(filter: EnvFilter) {
  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_target(false))
    .init();
}
