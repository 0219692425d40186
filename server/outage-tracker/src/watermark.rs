//! Per-channel watermarks: the timestamp of the last record applied.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::store::{transaction, Store};
use crate::types::Channel;

/// Starting point for a channel that has never been loaded.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Current watermark for `channel`. A missing one is set to [`EPOCH`] and
/// committed before returning.
pub fn load_or_init<S: Store + ?Sized>(
  store: &mut S,
  channel: Channel,
) -> Result<DateTime<Utc>, TrackerError> {
  if let Some(at) = store.watermark(channel)? {
    return Ok(at);
  }
  transaction(store, |tx| {
    tx.set_watermark(channel, EPOCH)?;
    Ok(())
  })?;
  info!(%channel, "watermark initialized to epoch");
  Ok(EPOCH)
}

/// Move the watermark to `at` inside the caller's transaction. Never moves
/// it backwards.
pub fn advance<S: Store + ?Sized>(
  store: &mut S,
  channel: Channel,
  at: DateTime<Utc>,
) -> Result<(), TrackerError> {
  match store.watermark(channel)? {
    Some(current) if at < current => {
      warn!(%channel, %current, record = %at, "record older than watermark; keeping watermark");
    }
    _ => {
      store.set_watermark(channel, at)?;
      debug!(%channel, %at, "watermark advanced");
    }
  }
  Ok(())
}
