//! Integration tests for the outage tracker.

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use outage_tracker::{
  Channel, CycleReport, JsonLinesSource, Kind, LogOutage, LogRecord, MemoryStore, ParseError,
  ParserRegistry, Payload, RawEmail, Replay, SlaDispatcher, Store, Tracker, TrackerError,
};

const PROVIDER_EMAIL: &str = include_str!("fixtures/provider_email.txt");

fn at(hour: u32, min: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2019, 4, 9, hour, min, 0).unwrap()
}

fn provider_email(received_at: DateTime<Utc>) -> RawEmail {
  RawEmail {
    received_at,
    source_key: "noc@fiberprovider.com".into(),
    content: PROVIDER_EMAIL.into(),
  }
}

fn log(logged_at: DateTime<Utc>, service_id: &str, begin: DateTime<Utc>, end: DateTime<Utc>) -> LogRecord {
  let mut payload = Payload::new();
  payload.insert("scanner".into(), "syslog".into());
  LogRecord {
    logged_at,
    outage: LogOutage {
      provider: "fiberprovider".into(),
      service_id: service_id.into(),
      begin,
      end,
      payload,
    },
  }
}

fn seeded_store() -> MemoryStore {
  let mut store = MemoryStore::new();
  store
    .add_device_or_circuit("fiberprovider", "IC-99999", Kind::Circuit, Some("Santa Clara uplink"))
    .unwrap();
  store
}

type Calls = Rc<RefCell<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>>;

fn recording_dispatcher(calls: &Calls) -> SlaDispatcher {
  let sink = Rc::clone(calls);
  let mut dispatcher = SlaDispatcher::new();
  dispatcher.register_fn("fiberprovider", move |v| {
    sink
      .borrow_mut()
      .push((v.provider().to_string(), v.outage.begin_time, v.outage.end_time));
    Ok(())
  });
  dispatcher
}

fn append_line<T: serde::Serialize>(path: &Path, record: &T) {
  let mut file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .unwrap();
  writeln!(file, "{}", serde_json::to_string(record).unwrap()).unwrap();
}

#[test]
fn fiberprovider_end_to_end() {
  let calls = Calls::default();
  let emails = Replay::new(vec![provider_email(at(5, 0))]);
  let logs = Replay::new(vec![log(at(7, 0), "IC-99999", at(6, 5), at(6, 45))]);
  let mut tracker = Tracker::new(
    seeded_store(),
    emails,
    logs,
    ParserRegistry::builtin(),
    recording_dispatcher(&calls),
  );

  // Detected outage inside the announced window: nothing to report.
  let report = tracker.run_cycle().unwrap();
  assert!(report.emails_processed);
  assert_eq!(report.detected, 1);
  assert_eq!(report.unscheduled, 0);
  assert!(calls.borrow().is_empty());

  let scheduled = tracker.store().scheduled_outages();
  assert_eq!(scheduled.len(), 1);
  assert_eq!(scheduled[0].outage_id, "PWIC12345");
  assert_eq!(scheduled[0].begin_time, at(6, 0));
  assert_eq!(scheduled[0].end_time, at(10, 0));
  assert_eq!(
    scheduled[0].payload.get("Location"),
    Some(&serde_json::Value::from("Santa Clara, CA, US"))
  );

  // Outage well after the window.
  tracker.logs_mut().push(log(at(12, 0), "IC-99999", at(11, 5), at(11, 25)));
  let report = tracker.run_cycle().unwrap();
  assert_eq!(
    report,
    CycleReport {
      emails_processed: false,
      detected: 1,
      unscheduled: 1,
      dispatched: 1,
    }
  );
  assert_eq!(
    *calls.borrow(),
    vec![("fiberprovider".to_string(), at(11, 5), at(11, 25))]
  );

  let unscheduled = tracker.store().unscheduled_outages();
  assert_eq!(unscheduled.len(), 1);
  assert_eq!(unscheduled[0].payload.get("scanner"), Some(&serde_json::Value::from("syslog")));
  assert_eq!(tracker.store().watermark(Channel::Log).unwrap(), Some(at(12, 0)));
  assert_eq!(tracker.store().watermark(Channel::Email).unwrap(), Some(at(5, 0)));
}

#[test]
fn overhanging_outage_is_unscheduled_in_full() {
  let calls = Calls::default();
  let emails = Replay::new(vec![provider_email(at(5, 0))]);
  let logs = Replay::new(vec![log(at(11, 0), "IC-99999", at(9, 30), at(10, 1))]);
  let mut tracker = Tracker::new(
    seeded_store(),
    emails,
    logs,
    ParserRegistry::builtin(),
    recording_dispatcher(&calls),
  );

  tracker.run_cycle().unwrap();
  assert_eq!(
    *calls.borrow(),
    vec![("fiberprovider".to_string(), at(9, 30), at(10, 1))]
  );
}

#[test]
fn unregistered_sender_stops_the_cycle() {
  let calls = Calls::default();
  let emails = Replay::new(vec![RawEmail {
    received_at: at(5, 0),
    source_key: "noc@copperco.example".into(),
    content: PROVIDER_EMAIL.into(),
  }]);
  let logs = Replay::new(vec![log(at(7, 0), "IC-99999", at(11, 5), at(11, 25))]);
  let mut tracker = Tracker::new(
    seeded_store(),
    emails,
    logs,
    ParserRegistry::builtin(),
    recording_dispatcher(&calls),
  );

  let err = tracker.run_cycle().unwrap_err();
  assert!(matches!(err, TrackerError::Parse(ParseError::NoParserRegistered { .. })));
  assert!(err.to_string().contains("noc@copperco.example"));
  assert_eq!(
    tracker.store().watermark(Channel::Email).unwrap(),
    Some(outage_tracker::watermark::EPOCH)
  );
  // Logs are never reached.
  assert!(tracker.store().detected_outages().is_empty());
  assert!(calls.borrow().is_empty());
}

#[test]
fn malformed_email_does_not_move_watermark() {
  let calls = Calls::default();
  let mut broken = provider_email(at(6, 0));
  broken.content = broken.content.replace("Service ID: IC-99999\n", "");
  let emails = Replay::new(vec![broken]);
  let mut tracker = Tracker::new(
    seeded_store(),
    emails,
    Replay::<LogRecord>::default(),
    ParserRegistry::builtin(),
    recording_dispatcher(&calls),
  );

  let err = tracker.run_cycle().unwrap_err();
  assert!(matches!(err, TrackerError::Parse(ParseError::Malformed { .. })));
  assert_eq!(
    tracker.store().watermark(Channel::Email).unwrap(),
    Some(outage_tracker::watermark::EPOCH)
  );
  assert!(tracker.store().scheduled_outages().is_empty());
}

#[test]
fn unknown_service_in_logs_is_fatal() {
  let calls = Calls::default();
  let logs = Replay::new(vec![
    log(at(7, 0), "IC-99999", at(6, 5), at(6, 45)),
    log(at(8, 0), "IC-00000", at(7, 5), at(7, 45)),
  ]);
  let mut tracker = Tracker::new(
    seeded_store(),
    Replay::<RawEmail>::default(),
    logs,
    ParserRegistry::builtin(),
    recording_dispatcher(&calls),
  );

  let err = tracker.run_cycle().unwrap_err();
  assert!(matches!(err, TrackerError::UnknownDeviceOrCircuit { .. }));
  assert_eq!(tracker.store().detected_outages().len(), 1);
  assert_eq!(tracker.store().watermark(Channel::Log).unwrap(), Some(at(7, 0)));
}

#[test]
fn restart_resumes_after_last_committed_record() {
  let dir = tempfile::tempdir().unwrap();
  let store_path = dir.path().join("store.json");
  let email_path = dir.path().join("emails.jsonl");
  let log_path = dir.path().join("logs.jsonl");

  {
    let mut store = MemoryStore::open(&store_path).unwrap();
    store
      .add_device_or_circuit("fiberprovider", "IC-99999", Kind::Circuit, None)
      .unwrap();
  }
  append_line(&email_path, &provider_email(at(5, 0)));
  append_line(&log_path, &log(at(7, 0), "IC-99999", at(6, 5), at(6, 45)));
  append_line(&log_path, &log(at(12, 0), "IC-99999", at(11, 5), at(11, 25)));

  let open = |calls: &Calls| {
    Tracker::new(
      MemoryStore::open(&store_path).unwrap(),
      JsonLinesSource::<RawEmail>::new(&email_path),
      JsonLinesSource::<LogRecord>::new(&log_path),
      ParserRegistry::builtin(),
      recording_dispatcher(calls),
    )
  };

  let calls = Calls::default();
  let mut first = open(&calls);
  let report = first.run_cycle().unwrap();
  assert_eq!(report.detected, 2);
  assert_eq!(report.dispatched, 1);
  drop(first);

  // Same spools, fresh process: nothing new.
  let mut second = open(&calls);
  assert_eq!(second.run_cycle().unwrap(), CycleReport::default());
  assert_eq!(second.store().scheduled_outages().len(), 1);
  assert_eq!(second.store().detected_outages().len(), 2);
  assert_eq!(second.store().unscheduled_outages().len(), 1);
  assert_eq!(calls.borrow().len(), 1);

  // A new log line is picked up exactly once.
  append_line(&log_path, &log(at(13, 0), "IC-99999", at(12, 30), at(12, 40)));
  let report = second.run_cycle().unwrap();
  assert_eq!(report.dispatched, 1);
  assert_eq!(calls.borrow().len(), 2);
  assert_eq!(second.store().watermark(Channel::Log).unwrap(), Some(at(13, 0)));
}
