//! Leads-table export.
//!
//! Writes the filtered lead table with display-ready columns: currency
//! amounts, minutes, `dd/mm/yyyy HH:MM` dates and status labels.

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::TimeZone;
use csv::Writer;
use serde::Serialize;

use crate::display::{format_date, format_text, MeetingBadge, SentimentTone};
use crate::error::Result;
use crate::models::{Lead, OutputFormat};

const CSV_HEADER: [&str; 15] = [
    "ID",
    "Created",
    "Name",
    "Lead Email",
    "Phone",
    "Closer",
    "Attempts",
    "Answered",
    "Meeting",
    "Meeting At",
    "Duration (min)",
    "Cost",
    "Sentiment",
    "Tone",
    "Summary",
];

/// One exported row
#[derive(Debug, Clone, Serialize)]
pub struct LeadRow {
    /// Backend id
    pub id: i64,
    /// `dd/mm/yyyy HH:MM`
    pub created: String,
    /// Lead name or the not-available placeholder
    pub name: String,
    /// Lead email as reported
    pub lead_email: String,
    /// Phone or the not-available placeholder
    pub phone: String,
    /// Closer email or the em-dash sentinel
    pub closer: String,
    /// Call attempts
    pub attempts: u32,
    /// Whether the lead answered
    pub answered: bool,
    /// Meeting badge
    pub meeting: MeetingBadge,
    /// `dd/mm/yyyy HH:MM` or the not-available placeholder
    pub meeting_at: String,
    /// Minutes, two decimals
    pub duration_minutes: Option<f64>,
    /// Currency units
    pub cost: Option<f64>,
    /// Sentiment text as reported
    pub sentiment: String,
    /// Tone classified from the sentiment text
    pub tone: SentimentTone,
    /// Call summary
    pub summary: String,
}

impl LeadRow {
    /// Display-ready row, dates rendered in `tz`
    #[must_use]
    pub fn from_lead<Tz>(lead: &Lead, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            id: lead.id,
            created: format_date(Some(lead.created_at), tz),
            name: format_text(&lead.name).to_string(),
            lead_email: lead.lead_email.clone(),
            phone: format_text(&lead.phone_number).to_string(),
            closer: lead.closer.to_string(),
            attempts: lead.attempts,
            answered: lead.was_answered,
            meeting: MeetingBadge::from_status(lead.meeting),
            meeting_at: format_date(lead.meeting_at, tz),
            duration_minutes: lead.call_duration_seconds.map(crate::display::seconds_to_minutes),
            cost: lead.call_cost_cents.map(crate::display::cents_to_currency),
            sentiment: format_text(&lead.sentiment).to_string(),
            tone: SentimentTone::classify(&lead.sentiment),
            summary: format_text(&lead.summary).to_string(),
        }
    }
}

/// Write leads to `output_dir/leads.<ext>`, returning the file path.
///
/// An empty lead set still produces a file (header only for CSV, `[]` for JSON).
pub fn export_leads<Tz>(leads: &[Lead], format: OutputFormat, output_dir: &Path, tz: &Tz) -> Result<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    create_dir_all(output_dir)?;
    let file_path = output_dir.join(format!("leads.{}", format.extension()));
    write_leads_to_file(leads, format, &file_path, tz)?;
    tracing::info!(count = leads.len(), path = %file_path.display(), "Exported leads");
    Ok(file_path)
}

/// Write leads to a file in the specified format.
pub fn write_leads_to_file<Tz>(leads: &[Lead], format: OutputFormat, file_path: &Path, tz: &Tz) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let file = File::create(file_path)?;
    write_leads(leads, format, BufWriter::new(file), tz)
}

/// Write leads to any writer (e.g. stdout).
pub fn write_leads<W, Tz>(leads: &[Lead], format: OutputFormat, writer: W, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let rows: Vec<LeadRow> = leads.iter().map(|lead| LeadRow::from_lead(lead, tz)).collect();
    match format {
        OutputFormat::Csv => write_csv(&rows, writer),
        OutputFormat::Json => write_json(&rows, writer),
    }
}

fn write_csv<W: Write>(rows: &[LeadRow], writer: W) -> Result<()> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        writer.write_record([
            row.id.to_string(),
            row.created.clone(),
            row.name.clone(),
            row.lead_email.clone(),
            row.phone.clone(),
            row.closer.clone(),
            row.attempts.to_string(),
            if row.answered { "yes" } else { "no" }.to_string(),
            row.meeting.label().to_string(),
            row.meeting_at.clone(),
            row.duration_minutes.map(|m| format!("{m:.2}")).unwrap_or_default(),
            row.cost.map(|c| format!("{c:.2}")).unwrap_or_default(),
            row.sentiment.clone(),
            row.tone.label().to_string(),
            row.summary.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(rows: &[LeadRow], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
