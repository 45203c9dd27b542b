//! In-memory lead repository
//!
//! Owns the only mutable lead collection. Readers get an immutable
//! `Arc<[Lead]>` snapshot that later changes never touch.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::adapter::{normalize, unrecognized_keys, ALIAS_TABLE_VERSION};
use crate::error::LeadError;
use crate::models::{ChangeEvent, ChangeKind, Lead, RawRecord};

/// Outcome of the initial bulk load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadState {
    /// No load attempted yet
    #[default]
    NotLoaded,
    /// The last load succeeded (possibly with zero leads)
    Ready,
    /// The last load failed; the previous snapshot is kept
    Failed(String),
}

impl LoadState {
    /// True after a successful load
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// What a change event did to the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// A new lead was placed at the front
    Inserted(i64),
    /// An existing lead was replaced in place
    Replaced(i64),
    /// A lead was removed
    Removed(i64),
    /// Nothing matched (delete of an unknown id)
    Ignored,
}

/// Lead collection with newest-first default order
#[derive(Debug)]
pub struct LeadRepository {
    leads: Vec<Lead>,
    snapshot: Arc<[Lead]>,
    state: LoadState,
    unrecognized: Vec<String>,
}

impl Default for LeadRepository {
    fn default() -> Self {
        Self {
            leads: Vec::new(),
            snapshot: Arc::from(Vec::new()),
            state: LoadState::NotLoaded,
            unrecognized: Vec::new(),
        }
    }
}

impl LeadRepository {
    /// Create an empty, not-yet-loaded repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and replace the whole snapshot.
    ///
    /// Leads are ordered by `created_at` descending (stable for ties). A
    /// duplicated id keeps its first occurrence in fetch order.
    pub fn load_all(&mut self, raw_records: Vec<RawRecord>) -> usize {
        let mut seen = HashSet::with_capacity(raw_records.len());
        let mut leads = Vec::with_capacity(raw_records.len());
        let mut unrecognized = BTreeSet::new();

        for raw in &raw_records {
            unrecognized.extend(unrecognized_keys(raw).into_iter().map(str::to_string));
            let lead = normalize(raw);
            if seen.insert(lead.id) {
                leads.push(lead);
            } else {
                warn!(lead_id = lead.id, "Duplicate lead id in bulk fetch, keeping first row");
            }
        }

        for column in &unrecognized {
            debug!(column = %column, alias_table = ALIAS_TABLE_VERSION, "Column not recognized by the adapter, ignored");
        }

        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.leads = leads;
        self.unrecognized = unrecognized.into_iter().collect();
        self.state = LoadState::Ready;
        self.publish();
        self.leads.len()
    }

    /// Source columns from the last load that no alias recognizes, sorted
    #[must_use]
    pub fn unrecognized_columns(&self) -> &[String] {
        &self.unrecognized
    }

    /// Record a failed load without touching the current snapshot
    pub fn mark_failed(&mut self, error: &LeadError) {
        self.state = LoadState::Failed(error.to_string());
    }

    /// Merge one change notification into the snapshot by id
    pub fn apply_change(&mut self, event: &ChangeEvent) -> ChangeOutcome {
        let outcome = match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let lead = normalize(&event.record);
                let id = lead.id;
                if let Some(slot) = self.leads.iter_mut().find(|existing| existing.id == id) {
                    *slot = lead;
                    ChangeOutcome::Replaced(id)
                } else {
                    if event.kind == ChangeKind::Update {
                        debug!(lead_id = id, "Update for unknown lead, inserting");
                    }
                    self.leads.insert(0, lead);
                    ChangeOutcome::Inserted(id)
                }
            },
            ChangeKind::Delete => {
                let id = normalize(event.identifying_record()).id;
                match self.leads.iter().position(|existing| existing.id == id) {
                    Some(index) => {
                        self.leads.remove(index);
                        ChangeOutcome::Removed(id)
                    },
                    None => ChangeOutcome::Ignored,
                }
            },
        };

        if outcome != ChangeOutcome::Ignored {
            self.publish();
        }
        outcome
    }

    /// Current immutable snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Lead]> {
        Arc::clone(&self.snapshot)
    }

    /// Outcome of the last bulk load
    #[must_use]
    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    /// Number of leads in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.leads.len()
    }

    /// True when the snapshot holds no leads
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    fn publish(&mut self) {
        self.snapshot = Arc::from(self.leads.as_slice());
    }
}

/// Turn a full re-fetch into the change events that bring `current` up to date.
///
/// Inserts are emitted oldest first so that prepending them keeps the
/// newest-first order; deletes carry a minimal `{"id": ..}` row.
#[must_use]
pub fn diff_snapshot(current: &[Lead], fetched: Vec<RawRecord>) -> Vec<ChangeEvent> {
    let known: HashMap<i64, &Lead> = current.iter().map(|lead| (lead.id, lead)).collect();
    let mut fetched_ids = HashSet::with_capacity(fetched.len());
    let mut inserts = Vec::new();
    let mut updates = Vec::new();

    for raw in fetched {
        let lead = normalize(&raw);
        if !fetched_ids.insert(lead.id) {
            continue;
        }
        match known.get(&lead.id) {
            None => inserts.push(ChangeEvent::new(ChangeKind::Insert, raw)),
            Some(existing) if **existing != lead => updates.push(ChangeEvent::new(ChangeKind::Update, raw)),
            Some(_) => {},
        }
    }

    let deletes = current
        .iter()
        .filter(|lead| !fetched_ids.contains(&lead.id))
        .map(|lead| {
            let mut row = RawRecord::new();
            row.insert("id".to_string(), serde_json::Value::from(lead.id));
            ChangeEvent { kind: ChangeKind::Delete, record: RawRecord::new(), old: Some(row) }
        });

    inserts.reverse();
    inserts.into_iter().chain(updates).chain(deletes).collect()
}
