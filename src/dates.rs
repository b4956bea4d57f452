use time::{Date, Duration, OffsetDateTime};

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Oldest calendar date a meal may be logged on: six days back, so the
/// loggable window is seven days including today.
pub fn earliest_loggable(today: Date) -> Date {
    today - Duration::days(6)
}

/// Start of the trailing seven-day reporting window, defined as
/// `date >= today - 7 days` for both meals and water logs.
pub fn trailing_week_start(today: Date) -> Date {
    today - Duration::days(7)
}

/// Serde adapter for `YYYY-MM-DD` calendar dates on the API surface.
pub mod iso_date {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, FORMAT).map_err(D::Error::custom)
    }
}
