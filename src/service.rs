//! Dashboard composition: sync → filter → aggregators
//!
//! `DashboardService` owns the sync lifecycle and turns the current snapshot
//! into a [`DashboardView`] for a given query. Views are built synchronously
//! from one immutable snapshot, so a change arriving mid-build is simply
//! picked up by the next view.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::buckets::{daily_trend, hourly_heatmap, weekday_heatmap, DayBucket, Heatmap};
use crate::config::AppConfig;
use crate::display::DisplayZone;
use crate::error::Result;
use crate::filter::{filter, LeadQuery};
use crate::finder::search;
use crate::funnel::{aggregate, FunnelMetrics};
use crate::logging::OperationTimer;
use crate::models::Lead;
use crate::repository::LoadState;
use crate::source::{ChangeFeed, LeadSource};
use crate::sync::{DashboardState, FeedStatus, LeadSync, SyncOptions};

/// Everything the presentation layer renders for one query
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// Outcome of the last bulk load
    pub load: LoadState,
    /// Live-update status
    pub feed: FeedStatus,
    /// Leads in the snapshot before filtering
    pub snapshot_size: usize,
    /// Filtered leads, newest first
    pub leads: Vec<Lead>,
    /// Funnel metrics over the filtered leads
    pub metrics: FunnelMetrics,
    /// Seven-day trend ending today
    pub trend: Vec<DayBucket>,
    /// Answer rate by hour of day
    pub hourly: Heatmap,
    /// Answer rate by weekday
    pub weekday: Heatmap,
}

impl DashboardView {
    /// Build a view of `state` for `query`, with the trend window ending on `today`
    #[must_use]
    pub fn build<Tz: TimeZone>(state: &DashboardState, query: &LeadQuery, today: NaiveDate, tz: &Tz) -> Self {
        let leads = filter(&state.leads, query);
        Self {
            load: state.load.clone(),
            feed: state.feed.clone(),
            snapshot_size: state.leads.len(),
            metrics: aggregate(&leads),
            trend: daily_trend(&leads, today, tz),
            hourly: hourly_heatmap(&leads, tz),
            weekday: weekday_heatmap(&leads, tz),
            leads,
        }
    }
}

/// Sync lifecycle plus the display settings views are built with
pub struct DashboardService {
    sync: LeadSync,
    zone: DisplayZone,
    finder_limit: usize,
}

impl DashboardService {
    /// Wrap an already created sync
    pub fn new(sync: LeadSync, zone: DisplayZone, finder_limit: usize) -> Self {
        Self { sync, zone, finder_limit }
    }

    /// Wire a service from configuration; `feed` is required for the push strategy
    pub fn from_config(
        config: &AppConfig,
        source: Arc<dyn LeadSource>,
        feed: Option<Arc<dyn ChangeFeed>>,
    ) -> Result<Self> {
        let strategy = LeadSync::strategy_from_config(config, feed)?;
        let sync = LeadSync::create(source, strategy, SyncOptions::from_config(&config.backend));
        Ok(Self::new(sync, config.dashboard.display_zone()?, config.dashboard.finder_limit))
    }

    /// Load the snapshot and start live updates.
    ///
    /// A failed load is already reflected in the view's `load` state, so only
    /// the feed status is returned.
    pub async fn start(&mut self) -> FeedStatus {
        if let Err(e) = self.sync.load_all().await {
            tracing::warn!(error = %e, "Starting with an unavailable snapshot");
        }
        self.sync.subscribe().await
    }

    /// Tear down live updates
    pub async fn stop(&mut self) {
        self.sync.dispose().await;
    }

    /// View of the current snapshot, trend window ending today in the display zone
    #[must_use]
    pub fn view(&self, query: &LeadQuery) -> DashboardView {
        let today = Utc::now().with_timezone(&self.zone).date_naive();
        self.view_at(query, today)
    }

    /// View with the trend window ending on `today`
    #[must_use]
    pub fn view_at(&self, query: &LeadQuery, today: NaiveDate) -> DashboardView {
        let timer = OperationTimer::new("build_view");
        let view = DashboardView::build(&self.sync.state(), query, today, &self.zone);
        tracing::debug!(leads = view.leads.len(), elapsed_us = timer.elapsed().as_micros(), "Built dashboard view");
        view
    }

    /// Autocomplete results over the full snapshot
    #[must_use]
    pub fn find(&self, term: &str) -> Vec<Lead> {
        search(&self.sync.snapshot(), term, self.finder_limit)
    }

    /// Underlying sync, for watching state changes
    #[must_use]
    pub const fn sync(&self) -> &LeadSync {
        &self.sync
    }

    /// Zone for calendar days, hours and weekdays
    #[must_use]
    pub const fn zone(&self) -> &DisplayZone {
        &self.zone
    }

    /// Cap on finder results
    #[must_use]
    pub const fn finder_limit(&self) -> usize {
        self.finder_limit
    }
}
