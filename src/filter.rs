//! Date-range and free-text filtering over a lead snapshot

use serde::{Deserialize, Serialize};

use crate::models::{DateRange, Lead};

/// Filter criteria; both predicates compose with AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadQuery {
    /// Inclusive `created_at` range; a no-op unless both bounds are set
    pub date_range: DateRange,
    /// Case-insensitive substring; empty or whitespace means no filtering
    pub search: Option<String>,
}

impl LeadQuery {
    /// Query with only a search term
    pub fn search(term: impl Into<String>) -> Self {
        Self { date_range: DateRange::default(), search: Some(term.into()) }
    }

    /// Query with only a date range
    #[must_use]
    pub fn within(date_range: DateRange) -> Self {
        Self { date_range, search: None }
    }

    /// Normalized search needle, or `None` when search is a no-op
    #[must_use]
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

/// Apply `query` to `leads`, preserving input order
#[must_use]
pub fn filter(leads: &[Lead], query: &LeadQuery) -> Vec<Lead> {
    let needle = query.needle();
    leads
        .iter()
        .filter(|lead| query.date_range.contains(lead.created_at))
        .filter(|lead| needle.as_deref().map_or(true, |needle| matches_text(lead, needle)))
        .cloned()
        .collect()
}

/// Searchable text fields in match order: name, lead email, phone, closer email
pub(crate) fn search_fields(lead: &Lead) -> impl Iterator<Item = &str> {
    [lead.name.as_deref(), Some(lead.lead_email.as_str()), lead.phone_number.as_deref(), lead.closer.email()]
        .into_iter()
        .flatten()
}

/// True when any searchable field contains `needle` (already lowercased)
pub(crate) fn matches_text(lead: &Lead, needle: &str) -> bool {
    search_fields(lead).any(|field| field.to_lowercase().contains(needle))
}
