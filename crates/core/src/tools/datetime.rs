use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use serde_json::{Value, json};
use std::fmt::Display;

/// Result of the `get_current_datetime` tool for the local clock.
pub fn current_datetime() -> Value {
    datetime_payload(Local::now())
}

pub fn datetime_payload<Tz>(now: DateTime<Tz>) -> Value
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    json!({
        "datetime": now.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true),
        "formatted": now.format("%A, %B %-d, %Y at %I:%M %p %Z").to_string(),
        "timestamp": now.timestamp_millis(),
    })
}
