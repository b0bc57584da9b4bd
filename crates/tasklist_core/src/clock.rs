//! Wall-clock source for ids and timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

/// Supplies the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// `Clock` backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Formats an instant as ISO-8601 UTC with millisecond precision,
/// e.g. `2026-10-18T09:30:00.000Z`.
pub fn iso_millis(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch, clamped at zero.
pub fn epoch_millis(instant: DateTime<Utc>) -> u64 {
    u64::try_from(instant.timestamp_millis()).unwrap_or(0)
}
