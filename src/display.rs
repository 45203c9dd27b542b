//! Display conversions shared by the aggregators, exports and the CLI
//!
//! Money is stored as integer cents and divided by 100 exactly once, here.
//! Every ratio goes through [`percent`] or [`ratio`], which resolve a zero
//! denominator to `0.0`.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;

use crate::models::{MeetingStatus, Reported};

/// Placeholder shown for values the backend never reported
pub const NOT_AVAILABLE: &str = "not available";

/// Round to `places` decimal places
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// `numerator / denominator`, or 0 when the denominator is zero
#[must_use]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Zero-guarded percentage rounded to one decimal place
#[must_use]
pub fn percent(numerator: u64, denominator: u64) -> f64 {
    round_to(ratio(numerator, denominator) * 100.0, 1)
}

/// Cents to currency units, two decimals
#[must_use]
pub fn cents_to_currency(cents: u64) -> f64 {
    round_to(cents as f64 / 100.0, 2)
}

/// Seconds to minutes, two decimals
#[must_use]
pub fn seconds_to_minutes(seconds: u64) -> f64 {
    round_to(seconds as f64 / 60.0, 2)
}

/// Averaged cents to currency units, two decimals
#[must_use]
pub fn average_cents_to_currency(cents: f64) -> f64 {
    round_to(cents / 100.0, 2)
}

/// Averaged seconds to minutes, two decimals
#[must_use]
pub fn average_seconds_to_minutes(seconds: f64) -> f64 {
    round_to(seconds / 60.0, 2)
}

/// `$45.00`, or the not-available placeholder
#[must_use]
pub fn format_cost(cents: Option<u64>) -> String {
    cents.map_or_else(|| NOT_AVAILABLE.to_string(), |c| format!("${}.{:02}", c / 100, c % 100))
}

/// `3.0 min`, or the not-available placeholder
#[must_use]
pub fn format_duration(seconds: Option<u64>) -> String {
    seconds.map_or_else(|| NOT_AVAILABLE.to_string(), |s| format!("{:.1} min", s as f64 / 60.0))
}

/// `dd/mm/yyyy HH:MM` in `tz`, or the not-available placeholder
#[must_use]
pub fn format_date<Tz>(at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |at| at.with_timezone(tz).format("%d/%m/%Y %H:%M").to_string(),
    )
}

/// Timezone for calendar days, hours and weekdays.
///
/// `Local` resolves the offset per instant, so timestamps on either side of
/// a daylight-saving change land in their own local hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    /// The host's local zone, including its daylight-saving rules
    Local,
    /// A fixed UTC offset
    Fixed(FixedOffset),
}

impl DisplayZone {
    /// UTC
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Offset in effect at `at`
    #[must_use]
    pub fn offset_at(&self, at: &DateTime<Utc>) -> FixedOffset {
        self.offset_from_utc_datetime(&at.naive_utc()).fix()
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Offset produced by [`DisplayZone`]; remembers its zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneOffset {
    zone: DisplayZone,
    fixed: FixedOffset,
}

impl Offset for ZoneOffset {
    fn fix(&self) -> FixedOffset {
        self.fixed
    }
}

impl fmt::Display for ZoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.fixed, f)
    }
}

impl TimeZone for DisplayZone {
    type Offset = ZoneOffset;

    fn from_offset(offset: &ZoneOffset) -> Self {
        offset.zone
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<ZoneOffset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<ZoneOffset> {
        let zone = *self;
        match self {
            Self::Local => Local.offset_from_local_datetime(local).map(|fixed| ZoneOffset { zone, fixed }),
            Self::Fixed(offset) => offset.offset_from_local_datetime(local).map(|fixed| ZoneOffset { zone, fixed }),
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> ZoneOffset {
        self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> ZoneOffset {
        let fixed = match self {
            Self::Local => Local.offset_from_utc_datetime(utc),
            Self::Fixed(offset) => *offset,
        };
        ZoneOffset { zone: *self, fixed }
    }
}

/// Reported text, or the not-available placeholder
#[must_use]
pub fn format_text(value: &Reported) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

/// Coarse tone of the free-text sentiment field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTone {
    /// Satisfied or positive wording
    Positive,
    /// Dissatisfied or negative wording
    Negative,
    /// Reported without a recognized keyword
    Neutral,
    /// Not reported
    Unknown,
}

const NEGATIVE_KEYWORDS: &[&str] = &["negativo", "insatisfeito"];
const POSITIVE_KEYWORDS: &[&str] = &["positivo", "satisfeito"];

impl SentimentTone {
    /// Classify by keyword; negative keywords win since "insatisfeito" contains "satisfeito"
    #[must_use]
    pub fn classify(sentiment: &Reported) -> Self {
        let Some(text) = sentiment.as_deref() else {
            return Self::Unknown;
        };
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            Self::Unknown
        } else if NEGATIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Negative
        } else if POSITIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Positive
        } else {
            Self::Neutral
        }
    }

    /// Lowercase label, matching the serialized form
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Unknown => "unknown",
        }
    }
}

/// Status badge for the meeting column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingBadge {
    /// A meeting was scheduled
    Converted,
    /// No outcome reported yet
    Pending,
    /// The call ended without a meeting
    NotConverted,
}

impl MeetingBadge {
    /// Badge for a normalized meeting status
    #[must_use]
    pub const fn from_status(status: MeetingStatus) -> Self {
        match status {
            MeetingStatus::Scheduled => Self::Converted,
            MeetingStatus::NotReported => Self::Pending,
            MeetingStatus::NotScheduled => Self::NotConverted,
        }
    }

    /// Lowercase label used in tables and exports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Converted => "converted",
            Self::Pending => "pending",
            Self::NotConverted => "not converted",
        }
    }
}
