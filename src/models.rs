//! Data models for lead records and change notifications
//!
//! `Lead` is the only shape the rest of the crate depends on. Raw backend rows
//! stay as untyped JSON maps until the adapter turns them into a `Lead`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LeadError;

/// Sentinel the backend and the original dashboard use for "no value reported".
pub const NOT_REPORTED: &str = "—";

/// One raw backend row: column name to JSON value, with unstable names and encodings.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Free-text value that is either reported or explicitly not available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reported {
    /// The backend reported a value (possibly an empty string)
    Value(String),
    /// The backend reported nothing, or the placeholder sentinel
    #[default]
    NotAvailable,
}

impl Reported {
    /// Borrow the reported text, if any
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Value(text) => Some(text.as_str()),
            Self::NotAvailable => None,
        }
    }
}

/// Closer assigned to a lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Closer {
    /// A closer email was reported
    Assigned(String),
    /// No closer yet; rendered as the em-dash sentinel
    #[default]
    Unassigned,
}

impl Closer {
    /// The closer email, if one is assigned
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Assigned(email) => Some(email.as_str()),
            Self::Unassigned => None,
        }
    }
}

impl fmt::Display for Closer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned(email) => f.write_str(email),
            Self::Unassigned => f.write_str(NOT_REPORTED),
        }
    }
}

/// Tri-state meeting outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// The source reported the affirmative token
    Scheduled,
    /// The source reported something other than the affirmative token
    NotScheduled,
    /// No value reported yet
    #[default]
    NotReported,
}

impl MeetingStatus {
    /// True only for an explicitly scheduled meeting
    #[must_use]
    pub const fn is_scheduled(self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

/// A canonical lead record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    /// Stable unique identifier
    pub id: i64,
    /// Row creation time; anchor for date filtering and heatmaps
    pub created_at: DateTime<Utc>,
    /// Lead email (may be empty)
    pub lead_email: String,
    /// Assigned closer or the unassigned sentinel
    pub closer: Closer,
    /// Number of contact attempts recorded on this lead
    pub attempts: u32,
    /// Whether a call was answered
    pub was_answered: bool,
    /// Meeting outcome
    pub meeting: MeetingStatus,
    /// When the scheduled meeting takes place, if reported
    pub meeting_at: Option<DateTime<Utc>>,
    /// Call duration in seconds
    pub call_duration_seconds: Option<u64>,
    /// Call cost in integer cents
    pub call_cost_cents: Option<u64>,
    /// Dedicated call timestamp, when the source recorded one
    pub call_timestamp: Option<DateTime<Utc>>,
    /// Call summary
    pub summary: Reported,
    /// Caller sentiment as free text
    pub sentiment: Reported,
    /// Lead name
    pub name: Reported,
    /// Lead phone number
    pub phone_number: Reported,
}

impl Lead {
    /// Timestamp used for calendar bucketing: the call time, else creation time
    #[must_use]
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.call_timestamp.unwrap_or(self.created_at)
    }

    /// True when at least one contact attempt was made
    #[must_use]
    pub const fn was_contacted(&self) -> bool {
        self.attempts > 0
    }
}

/// Kind of row change emitted by the backend feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A new row
    Insert,
    /// An existing row changed
    Update,
    /// A row was removed
    Delete,
}

impl ChangeKind {
    /// Lowercase label used in logs and telemetry
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A change notification as delivered by the backend feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Insert, update or delete
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    /// Row after the change (empty for most deletes)
    #[serde(rename = "new", default)]
    pub record: RawRecord,
    /// Row before the change, when the backend sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<RawRecord>,
}

impl ChangeEvent {
    /// Build an event without a previous row
    #[must_use]
    pub const fn new(kind: ChangeKind, record: RawRecord) -> Self {
        Self { kind, record, old: None }
    }

    /// The row that identifies the affected lead: `old` for deletes when present
    #[must_use]
    pub fn identifying_record(&self) -> &RawRecord {
        match (&self.kind, &self.old) {
            (ChangeKind::Delete, Some(old)) if !old.is_empty() => old,
            _ => &self.record,
        }
    }
}

/// Date range for filtering leads by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// Start (inclusive, optional)
    pub start: Option<DateTime<Utc>>,
    /// End (inclusive, optional)
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// A range with both bounds
    #[must_use]
    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    /// Whole calendar days in `tz`: from `start` 00:00 through the last instant of `end`
    #[must_use]
    pub fn from_days<Tz: TimeZone>(start: NaiveDate, end: NaiveDate, tz: &Tz) -> Self {
        let first = start_of_day(start, tz);
        let last = end
            .succ_opt()
            .and_then(|next| start_of_day(next, tz))
            .map(|next| next - chrono::Duration::nanoseconds(1));
        Self { start: first, end: last }
    }

    /// True when both bounds are set; otherwise the range does not filter
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Inclusive containment; an unbounded range contains everything
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= at && at <= end,
            _ => true,
        }
    }
}

fn start_of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Output format for exported leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = LeadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(LeadError::InvalidInput(format!("unknown output format: {other}"))),
        }
    }
}
