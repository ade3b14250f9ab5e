use chrono::format::StrftimeItems;
use chrono::{DateTime, NaiveDateTime};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// unix_nano_to_time converts a record timestamp (nanoseconds since the Unix
/// epoch) into a UTC calendar time.
pub fn unix_nano_to_time(unix_nano: u64) -> NaiveDateTime {
    let secs = (unix_nano / NANOS_PER_SEC) as i64;
    let nsecs = (unix_nano % NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, nsecs)
        .unwrap_or_default()
        .naive_utc()
}

pub fn time_format(dt: NaiveDateTime) -> String {
    let fmt = StrftimeItems::new("%Y-%m-%d %H:%M:%S%.9f");
    format!("{}", dt.format_with_items(fmt))
}

/// unix_nano_format renders a record timestamp for humans.
pub fn unix_nano_format(unix_nano: u64) -> String {
    time_format(unix_nano_to_time(unix_nano))
}

/// unix_nano_to_secs returns the timestamp as fractional seconds.
pub fn unix_nano_to_secs(unix_nano: u64) -> f64 {
    unix_nano as f64 / NANOS_PER_SEC as f64
}
