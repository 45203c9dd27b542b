//! Raw record adapter
//!
//! The single translation boundary between backend rows and [`Lead`]. Column
//! names and encodings drifted across schema revisions, so every canonical
//! field has a fixed list of recognized source keys (tried in order, first
//! non-null wins) and a total parse: malformed values fall back to the
//! field's default instead of failing the record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{Closer, Lead, MeetingStatus, RawRecord, Reported, NOT_REPORTED};

/// Version of the alias table below; bump when a schema revision adds keys.
pub const ALIAS_TABLE_VERSION: u32 = 3;

/// Source keys recognized for one canonical field
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    /// Canonical field name
    pub field: &'static str,
    /// Source keys, most recent schema first
    pub keys: &'static [&'static str],
}

const ID: FieldAliases = FieldAliases { field: "id", keys: &["id"] };
const CREATED_AT: FieldAliases = FieldAliases { field: "created_at", keys: &["created_at", "createdAt"] };
const LEAD_EMAIL: FieldAliases = FieldAliases { field: "lead_email", keys: &["email_lead", "emailLead", "lead_email"] };
const CLOSER: FieldAliases = FieldAliases { field: "closer", keys: &["email_closer", "emailCloser", "closer_email"] };
const ATTEMPTS: FieldAliases = FieldAliases { field: "attempts", keys: &["tentativas", "attempts"] };
const ANSWERED: FieldAliases = FieldAliases { field: "was_answered", keys: &["atendido?", "atendido", "wasAnswered"] };
const MEETING: FieldAliases = FieldAliases {
    field: "meeting",
    keys: &["Reuniao_marcada?", "reuniao_marcada", "Reuniao_marcada", "meetingScheduled"],
};
const MEETING_AT: FieldAliases = FieldAliases { field: "meeting_at", keys: &["dateTime", "date_time"] };
const DURATION: FieldAliases = FieldAliases { field: "call_duration_seconds", keys: &["Duracao", "duracao"] };
const COST: FieldAliases = FieldAliases { field: "call_cost_cents", keys: &["Custo_total", "custo_total"] };
const CALL_AT: FieldAliases = FieldAliases {
    field: "call_timestamp",
    keys: &["Data_horario_ligação", "data_horario_ligacao"],
};
const SUMMARY: FieldAliases = FieldAliases { field: "summary", keys: &["Resumo_ligação", "resumo_ligacao"] };
const SENTIMENT: FieldAliases = FieldAliases {
    field: "sentiment",
    keys: &["Sentimento_do_usuário", "sentimento_do_usuario"],
};
const NAME: FieldAliases = FieldAliases { field: "name", keys: &["Nome", "nome"] };
const PHONE: FieldAliases = FieldAliases { field: "phone_number", keys: &["Numero", "numero"] };

/// Every recognized field, in canonical order
pub const ALIASES: &[FieldAliases] = &[
    ID, CREATED_AT, LEAD_EMAIL, CLOSER, ATTEMPTS, ANSWERED, MEETING, MEETING_AT, DURATION, COST, CALL_AT, SUMMARY,
    SENTIMENT, NAME, PHONE,
];

/// Tokens the source system uses for "yes", compared case-insensitively
const AFFIRMATIVE_TOKENS: &[&str] = &["sim", "true"];

/// Naive timestamp layouts seen in the backend, read as UTC
const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Normalize one raw backend row into a canonical lead.
///
/// Pure: the result depends only on `raw`. Defaults when a field is missing
/// or malformed: `id` 0, `created_at` the Unix epoch, `attempts` 0, booleans
/// false, optional numerics and timestamps absent, text fields
/// [`Reported::NotAvailable`], closer [`Closer::Unassigned`].
#[must_use]
pub fn normalize(raw: &RawRecord) -> Lead {
    Lead {
        id: lookup(raw, &ID).and_then(parse_id).unwrap_or_default(),
        created_at: lookup(raw, &CREATED_AT)
            .and_then(parse_timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        lead_email: lookup(raw, &LEAD_EMAIL).map(parse_plain_text).unwrap_or_default(),
        closer: match parse_text(lookup(raw, &CLOSER)) {
            Reported::Value(email) => Closer::Assigned(email),
            Reported::NotAvailable => Closer::Unassigned,
        },
        attempts: lookup(raw, &ATTEMPTS)
            .and_then(parse_count)
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)),
        was_answered: lookup(raw, &ANSWERED).is_some_and(is_affirmative),
        meeting: parse_meeting(lookup(raw, &MEETING)),
        meeting_at: lookup(raw, &MEETING_AT).and_then(parse_timestamp),
        call_duration_seconds: lookup(raw, &DURATION).and_then(parse_count),
        call_cost_cents: lookup(raw, &COST).and_then(parse_count),
        call_timestamp: lookup(raw, &CALL_AT).and_then(parse_timestamp),
        summary: parse_text(lookup(raw, &SUMMARY)),
        sentiment: parse_text(lookup(raw, &SENTIMENT)),
        name: parse_text(lookup(raw, &NAME)),
        phone_number: parse_text(lookup(raw, &PHONE)),
    }
}

/// Keys in `raw` that no alias recognizes; handy when a new schema revision lands.
#[must_use]
pub fn unrecognized_keys(raw: &RawRecord) -> Vec<&str> {
    raw.keys()
        .map(String::as_str)
        .filter(|key| !ALIASES.iter().any(|alias| alias.keys.contains(key)))
        .collect()
}

fn lookup<'a>(raw: &'a RawRecord, aliases: &FieldAliases) -> Option<&'a Value> {
    aliases
        .keys
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-negative integer from a number or numeric-looking string.
///
/// Negative values clamp to zero; fractions round to the nearest integer;
/// anything that does not parse in full yields `None`.
fn parse_count(value: &Value) -> Option<u64> {
    let number = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            n.as_f64()?
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(u) = trimmed.parse::<u64>() {
                return Some(u);
            }
            trimmed.parse::<f64>().ok()?
        },
        _ => return None,
    };

    if !number.is_finite() {
        return None;
    }
    if number <= 0.0 {
        return Some(0);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = number.round() as u64;
    Some(rounded)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if text.is_empty() || text == NOT_REPORTED {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// "Equals the affirmative token" - never string truthiness.
fn is_affirmative(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(s) => {
            let token = s.trim();
            AFFIRMATIVE_TOKENS.iter().any(|yes| token.eq_ignore_ascii_case(yes))
        },
        _ => false,
    }
}

fn parse_meeting(value: Option<&Value>) -> MeetingStatus {
    match value {
        None => MeetingStatus::NotReported,
        Some(Value::String(s)) if s.trim().is_empty() || s.trim() == NOT_REPORTED => MeetingStatus::NotReported,
        Some(v) if is_affirmative(v) => MeetingStatus::Scheduled,
        Some(_) => MeetingStatus::NotScheduled,
    }
}

fn parse_text(value: Option<&Value>) -> Reported {
    match value {
        None => Reported::NotAvailable,
        Some(Value::String(s)) if s.trim() == NOT_REPORTED => Reported::NotAvailable,
        Some(v) => Reported::Value(parse_plain_text(v)),
    }
}

fn parse_plain_text(value: &Value) -> String {
    match value {
        Value::String(s) if s.trim() == NOT_REPORTED => String::new(),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_null_alias_falls_through_to_next_key() {
        let record = raw(json!({"atendido?": null, "atendido": true}));
        assert!(normalize(&record).was_answered);
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count(&json!(3)), Some(3));
        assert_eq!(parse_count(&json!("3")), Some(3));
        assert_eq!(parse_count(&json!(" 4 ")), Some(4));
        assert_eq!(parse_count(&json!(-2)), Some(0));
        assert_eq!(parse_count(&json!("2.6")), Some(3));
        assert_eq!(parse_count(&json!("3 calls")), None);
        assert_eq!(parse_count(&json!(true)), None);
    }

    #[test]
    fn test_timestamp_layouts() {
        assert!(parse_timestamp(&json!("2025-05-29T20:21:14")).is_some());
        assert!(parse_timestamp(&json!("2025-05-28T17:00:00-03:00")).is_some());
        assert!(parse_timestamp(&json!("2025-05-29 20:21:14.123+00")).is_some());
        assert!(parse_timestamp(&json!("2025-05-29")).is_some());
        assert!(parse_timestamp(&json!("—")).is_none());
        assert!(parse_timestamp(&json!("yesterday")).is_none());
    }

    #[test]
    fn test_unrecognized_keys() {
        let record = raw(json!({"id": 1, "tentativas": "2", "campaign": "x"}));
        assert_eq!(unrecognized_keys(&record), vec!["campaign"]);
    }
}
