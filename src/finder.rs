//! Autocomplete lookup over the lead snapshot

use crate::filter::matches_text;
use crate::models::Lead;

/// Results shown by the autocomplete dropdown
pub const DEFAULT_LIMIT: usize = 10;

/// Leads whose id or text fields contain `term`, in snapshot order, at most `limit`.
///
/// Unlike [`crate::filter::filter`], an empty term yields nothing.
#[must_use]
pub fn search(leads: &[Lead], term: &str, limit: usize) -> Vec<Lead> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    leads
        .iter()
        .filter(|lead| lead.id.to_string().contains(&needle) || matches_text(lead, &needle))
        .take(limit)
        .cloned()
        .collect()
}

/// Search box state: the typed term and the selected lead
#[derive(Debug, Clone)]
pub struct LeadFinder {
    term: String,
    selected: Option<i64>,
    limit: usize,
}

impl Default for LeadFinder {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl LeadFinder {
    /// Empty finder returning at most `limit` results
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { term: String::new(), selected: None, limit }
    }

    /// Current term as typed
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Replace the typed term; typing keeps the current selection
    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
    }

    /// Matches for the current term
    #[must_use]
    pub fn results(&self, leads: &[Lead]) -> Vec<Lead> {
        search(leads, &self.term, self.limit)
    }

    /// Select a lead; the term becomes its email. Selecting twice is a no-op.
    pub fn select(&mut self, lead: &Lead) {
        self.selected = Some(lead.id);
        self.term.clone_from(&lead.lead_email);
    }

    /// Clear the term and the selection
    pub fn clear(&mut self) {
        self.term.clear();
        self.selected = None;
    }

    /// Id of the selected lead
    #[must_use]
    pub const fn selected_id(&self) -> Option<i64> {
        self.selected
    }

    /// The selected lead as it appears in `leads` now; `None` if it was removed
    #[must_use]
    pub fn selected_lead<'a>(&self, leads: &'a [Lead]) -> Option<&'a Lead> {
        let id = self.selected?;
        leads.iter().find(|lead| lead.id == id)
    }
}
