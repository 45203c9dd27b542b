//! Fixed-domain time buckets: 7-day trend and hour/weekday heatmaps
//!
//! Every function returns the full domain (7 days, 24 hours or 7 weekdays)
//! with zero-valued buckets where no lead landed. Calendar fields are taken
//! in the caller's display timezone.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, TimeZone, Timelike};
use serde::Serialize;

use crate::display::{cents_to_currency, percent, ratio, seconds_to_minutes};
use crate::models::Lead;

/// Days covered by the trend window, today included
pub const TREND_DAYS: u64 = 7;

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One calendar day of the trend window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    /// Calendar day in the display zone
    pub date: NaiveDate,
    /// `YYYY-MM-DD`
    pub key: String,
    /// Leads landing on this day
    pub leads: u64,
    /// Of which had a meeting scheduled
    pub meetings: u64,
    /// Of which had at least one attempt
    pub contacted: u64,
    /// Sum of reported call costs
    pub cost_cents: u64,
    /// Sum of reported call durations
    pub duration_seconds: u64,
    /// `cost_cents / 100`
    pub cost: f64,
    /// `duration_seconds / 60`
    pub duration_minutes: f64,
}

impl DayBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            key: date.format("%Y-%m-%d").to_string(),
            leads: 0,
            meetings: 0,
            contacted: 0,
            cost_cents: 0,
            duration_seconds: 0,
            cost: 0.0,
            duration_minutes: 0.0,
        }
    }
}

/// The 7 calendar days ending `today`, oldest first.
///
/// A lead lands on the calendar date of its call timestamp, falling back to
/// its creation time.
#[must_use]
pub fn daily_trend<Tz: TimeZone>(leads: &[Lead], today: NaiveDate, tz: &Tz) -> Vec<DayBucket> {
    let first = today.checked_sub_days(Days::new(TREND_DAYS - 1)).unwrap_or(today);
    let mut buckets: Vec<DayBucket> = first.iter_days().take_while(|day| *day <= today).map(DayBucket::empty).collect();
    let index: HashMap<NaiveDate, usize> = buckets.iter().enumerate().map(|(i, b)| (b.date, i)).collect();

    for lead in leads {
        let day = lead.activity_at().with_timezone(tz).date_naive();
        let Some(&slot) = index.get(&day) else {
            continue;
        };
        let bucket = &mut buckets[slot];
        bucket.leads += 1;
        if lead.meeting.is_scheduled() {
            bucket.meetings += 1;
        }
        if lead.was_contacted() {
            bucket.contacted += 1;
        }
        bucket.cost_cents += lead.call_cost_cents.unwrap_or(0);
        bucket.duration_seconds += lead.call_duration_seconds.unwrap_or(0);
    }

    for bucket in &mut buckets {
        bucket.cost = cents_to_currency(bucket.cost_cents);
        bucket.duration_minutes = seconds_to_minutes(bucket.duration_seconds);
    }
    buckets
}

/// Visual intensity of a heatmap cell relative to the busiest cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityTier {
    /// Zero rate, or every cell is zero
    NoData,
    /// Up to a quarter of the busiest rate
    Low,
    /// Up to half
    Medium,
    /// Up to three quarters
    High,
    /// Above three quarters
    Peak,
}

impl IntensityTier {
    /// Tier for `rate / max_rate`
    #[must_use]
    pub fn from_rates(rate: f64, max_rate: f64) -> Self {
        if max_rate <= 0.0 || rate <= 0.0 {
            return Self::NoData;
        }
        let intensity = rate / max_rate;
        if intensity <= 0.25 {
            Self::Low
        } else if intensity <= 0.5 {
            Self::Medium
        } else if intensity <= 0.75 {
            Self::High
        } else {
            Self::Peak
        }
    }

    /// Dark cells (intensity above one half) take light text
    #[must_use]
    pub const fn uses_light_text(self) -> bool {
        matches!(self, Self::High | Self::Peak)
    }
}

/// One heatmap slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    /// Hour 0-23, or weekday 0 (Sunday) to 6
    pub slot: u32,
    /// `09h` or `Mon`
    pub label: String,
    /// Sum of attempts, not lead count
    pub calls: u64,
    /// Answered leads
    pub answered: u64,
    /// answered / calls as a percentage, one decimal
    pub rate: f64,
    /// Intensity relative to the busiest cell
    pub tier: IntensityTier,
}

/// Answer rate over a fixed set of slots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    /// Every slot in order, empty ones included
    pub cells: Vec<HeatCell>,
    /// Highest cell rate
    pub max_rate: f64,
}

impl Heatmap {
    /// Cell with the highest rate; earliest slot wins ties. `None` when all are zero.
    #[must_use]
    pub fn busiest(&self) -> Option<&HeatCell> {
        self.cells
            .iter()
            .filter(|cell| cell.tier != IntensityTier::NoData)
            .fold(None, |best: Option<&HeatCell>, cell| match best {
                Some(b) if b.rate >= cell.rate => Some(b),
                _ => Some(cell),
            })
    }
}

/// 24 cells keyed by the hour of `created_at`
#[must_use]
pub fn hourly_heatmap<Tz: TimeZone>(leads: &[Lead], tz: &Tz) -> Heatmap {
    let labels: Vec<String> = (0..24).map(|hour| format!("{hour:02}h")).collect();
    build_heatmap(leads, labels, |lead| lead.created_at.with_timezone(tz).hour())
}

/// 7 cells keyed by the weekday of `created_at`, Sunday first
#[must_use]
pub fn weekday_heatmap<Tz: TimeZone>(leads: &[Lead], tz: &Tz) -> Heatmap {
    let labels: Vec<String> = WEEKDAY_LABELS.iter().map(ToString::to_string).collect();
    build_heatmap(leads, labels, |lead| lead.created_at.with_timezone(tz).weekday().num_days_from_sunday())
}

fn build_heatmap(leads: &[Lead], labels: Vec<String>, slot_of: impl Fn(&Lead) -> u32) -> Heatmap {
    let mut counts = vec![(0_u64, 0_u64); labels.len()];
    for lead in leads {
        let Some(entry) = counts.get_mut(slot_of(lead) as usize) else {
            continue;
        };
        entry.0 += u64::from(lead.attempts);
        if lead.was_answered {
            entry.1 += 1;
        }
    }

    // Tiers use exact ratios so display rounding never shifts a cell.
    let exact: Vec<f64> = counts.iter().map(|&(calls, answered)| ratio(answered, calls)).collect();
    let max_exact = exact.iter().copied().fold(0.0_f64, f64::max);

    let cells: Vec<HeatCell> = labels
        .into_iter()
        .zip(counts)
        .zip(exact)
        .enumerate()
        .map(|(slot, ((label, (calls, answered)), exact_rate))| HeatCell {
            slot: u32::try_from(slot).unwrap_or(u32::MAX),
            label,
            calls,
            answered,
            rate: percent(answered, calls),
            tier: IntensityTier::from_rates(exact_rate, max_exact),
        })
        .collect();

    let max_rate = cells.iter().map(|cell| cell.rate).fold(0.0_f64, f64::max);
    Heatmap { cells, max_rate }
}
