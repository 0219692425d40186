//! Planned-work notices sent by noc@fiberprovider.com.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use super::MaintenanceParser;
use crate::error::ParseError;
use crate::types::MaintenanceNotification;

static NOTICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(concat!(
    r"(?msi)^Subject: (?P<subj>.*?)$",
    r".*?^PW Reference Number: (?P<id>\w+)$",
    r".*?^Start Date and Time: (?P<begin>\d{4}-\w{3}-\d{2} \d{2}:\d{2}\s+\w+)$",
    r".*?^End Date and Time: (?P<end>\d{4}-\w{3}-\d{2} \d{2}:\d{2}\s+\w+)$",
    r".*?^Action and Reason: (?P<action_reason>.*?(?:New try for cancelled (?P<cancelled>\w+)\.)*)$",
    r".*?^Location of work: (?P<location>.*?)$",
    r".*?^Service ID: (?P<service_id>.*?)$",
    r".*?^Impact: (?P<impact>.*?)$",
    r".*?^E-mail: (?P<email>.*?)$",
    r".*?^Phone: (?P<phone>.*?)$",
  ))
  .unwrap()
});

/// `2019-Apr-09 06:00 UTC`. Only UTC/GMT is accepted.
fn parse_time(source_key: &str, raw: &str) -> Result<DateTime<Utc>, ParseError> {
  let (stamp, zone) = raw
    .rsplit_once(char::is_whitespace)
    .ok_or_else(|| ParseError::bad_timestamp(source_key, raw, "missing time zone"))?;
  if !matches!(zone.to_ascii_uppercase().as_str(), "UTC" | "GMT") {
    return Err(ParseError::bad_timestamp(
      source_key,
      raw,
      format!("unsupported time zone {}", zone),
    ));
  }
  NaiveDateTime::parse_from_str(stamp.trim_end(), "%Y-%b-%d %H:%M")
    .map(|naive| naive.and_utc())
    .map_err(|e| ParseError::bad_timestamp(source_key, raw, e.to_string()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FiberProviderParser;

impl FiberProviderParser {
  pub const SOURCE_KEY: &'static str = "noc@fiberprovider.com";
  pub const PROVIDER: &'static str = "fiberprovider";
}

impl MaintenanceParser for FiberProviderParser {
  fn parse(&self, source_key: &str, content: &str) -> Result<MaintenanceNotification, ParseError> {
    let caps = NOTICE_REGEX
      .captures(content)
      .ok_or_else(|| ParseError::malformed(source_key, "not a planned work notice"))?;
    let field = |name: &str| {
      caps
        .name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
    };

    let begin = parse_time(source_key, &field("begin"))?;
    let end = parse_time(source_key, &field("end"))?;
    if end < begin {
      return Err(ParseError::malformed(source_key, "end time before start time"));
    }

    Ok(MaintenanceNotification {
      provider: Self::PROVIDER.to_string(),
      create_id: Some(field("id")).filter(|s| !s.is_empty()),
      cancel_id: Some(field("cancelled")).filter(|s| !s.is_empty()),
      service_id: field("service_id"),
      begin,
      end,
      subject: field("subj"),
      action_reason: field("action_reason"),
      location: field("location"),
      impact: field("impact"),
      contact_email: field("email"),
      contact_phone: field("phone"),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  const SAMPLE: &str = "Subject: Planned Work PWIC12345 Notification from Fiber Provider to AwesomeCorp, 2019-Apr-09 06:00 - 2019-Apr-09 10:00 UTC

Dear Customer,

Please be advised of the following planned work.

PW Reference Number: PWIC12345
Type of Work: Planned work

Start Date and Time: 2019-Apr-09 06:00 UTC
End Date and Time: 2019-Apr-09 10:00 UTC

Action and Reason: Fault repair work. Card replacement due to malfunction transmission system card. New try for cancelled PWIC45678.
Location of work: Santa Clara, CA, US

Service ID: IC-99999
Impact: 1 x 3 hours interruption

Contact
E-mail: noc@fiberprovider.com
Phone: 8675309
";

  fn parse(content: &str) -> Result<MaintenanceNotification, ParseError> {
    FiberProviderParser.parse(FiberProviderParser::SOURCE_KEY, content)
  }

  #[test]
  fn parses_sample_notice() {
    let n = parse(SAMPLE).unwrap();
    assert_eq!(n.provider, "fiberprovider");
    assert_eq!(n.create_id.as_deref(), Some("PWIC12345"));
    assert_eq!(n.cancel_id.as_deref(), Some("PWIC45678"));
    assert_eq!(n.service_id, "IC-99999");
    assert_eq!(n.begin, Utc.with_ymd_and_hms(2019, 4, 9, 6, 0, 0).unwrap());
    assert_eq!(n.end, Utc.with_ymd_and_hms(2019, 4, 9, 10, 0, 0).unwrap());
    assert_eq!(
      n.subject,
      "Planned Work PWIC12345 Notification from Fiber Provider to AwesomeCorp, 2019-Apr-09 06:00 - 2019-Apr-09 10:00 UTC"
    );
    assert_eq!(
      n.action_reason,
      "Fault repair work. Card replacement due to malfunction transmission system card. New try for cancelled PWIC45678."
    );
    assert_eq!(n.location, "Santa Clara, CA, US");
    assert_eq!(n.impact, "1 x 3 hours interruption");
    assert_eq!(n.contact_email, "noc@fiberprovider.com");
    assert_eq!(n.contact_phone, "8675309");
  }

  #[test]
  fn notice_without_retry_has_no_cancel_id() {
    let content = SAMPLE.replace(" New try for cancelled PWIC45678.", "");
    let n = parse(&content).unwrap();
    assert_eq!(n.cancel_id, None);
    assert_eq!(n.create_id.as_deref(), Some("PWIC12345"));
    assert!(n.action_reason.ends_with("transmission system card."));
  }

  #[test]
  fn missing_fields_are_malformed() {
    let content = SAMPLE.replace("Service ID: IC-99999\n", "");
    let err = parse(&content).unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
    assert!(matches!(
      parse("hello, no maintenance here").unwrap_err(),
      ParseError::Malformed { .. }
    ));
  }

  #[test]
  fn bad_month_is_bad_timestamp() {
    let content = SAMPLE.replace("Start Date and Time: 2019-Apr-09", "Start Date and Time: 2019-Foo-09");
    let err = parse(&content).unwrap_err();
    assert!(matches!(err, ParseError::BadTimestamp { .. }));
  }

  #[test]
  fn non_utc_zone_is_rejected() {
    let content = SAMPLE.replace("End Date and Time: 2019-Apr-09 10:00 UTC", "End Date and Time: 2019-Apr-09 10:00 PST");
    let err = parse(&content).unwrap_err();
    assert!(err.to_string().contains("PST"));
  }
}
