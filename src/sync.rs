//! Repository lifecycle: `create → load_all → subscribe → dispose`
//!
//! `LeadSync` is the single writer. It owns the repository, runs at most one
//! background listener (push feed or poll timer, chosen once at construction)
//! that applies changes strictly one at a time, and publishes every new
//! snapshot plus load/feed status on a `watch` channel for readers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, BackendConfig};
use crate::error::{LeadError, Result};
use crate::logging::OperationTimer;
use crate::models::{ChangeEvent, Lead, RawRecord};
use crate::repository::{diff_snapshot, ChangeOutcome, LeadRepository, LoadState};
use crate::source::{ChangeFeed, FeedSubscription, LeadSource};
use crate::telemetry::TelemetryRecorder;

/// How the snapshot is kept fresh after the initial load
#[derive(Clone)]
pub enum SyncStrategy {
    /// Apply change notifications from a push feed
    Push(Arc<dyn ChangeFeed>),
    /// Re-fetch on a fixed interval and diff against the snapshot
    Poll(Duration),
    /// Never refresh after `load_all`
    Static,
}

impl fmt::Debug for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(_) => f.write_str("Push"),
            Self::Poll(every) => f.debug_tuple("Poll").field(every).finish(),
            Self::Static => f.write_str("Static"),
        }
    }
}

/// Connection details shared by fetch and subscription
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Logical table the feed subscribes to
    pub table: String,
    /// Upper bound on one bulk fetch
    pub fetch_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&BackendConfig::default())
    }
}

impl SyncOptions {
    /// Table and fetch deadline from the backend section
    #[must_use]
    pub fn from_config(backend: &BackendConfig) -> Self {
        Self { table: backend.table.clone(), fetch_timeout: Duration::from_secs(backend.fetch_timeout_secs) }
    }
}

/// Live-update status, observable by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No listener running (static strategy or not subscribed yet)
    #[default]
    Inactive,
    /// Push feed established
    Subscribed,
    /// Poll timer running
    Polling,
    /// Subscription failed or broke; the snapshot is static from here on
    Failed(String),
    /// Listener torn down by `dispose`
    Closed,
}

impl FeedStatus {
    /// True while changes can still arrive
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Subscribed | Self::Polling)
    }
}

/// Everything a reader needs: the snapshot and both status flags
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Immutable lead snapshot, newest first
    pub leads: Arc<[Lead]>,
    /// Outcome of the last bulk load
    pub load: LoadState,
    /// Live-update status
    pub feed: FeedStatus,
    /// Bumped on every publish
    pub revision: u64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self { leads: Arc::from(Vec::new()), load: LoadState::NotLoaded, feed: FeedStatus::Inactive, revision: 0 }
    }
}

struct Shared {
    repository: Mutex<LeadRepository>,
    state: watch::Sender<DashboardState>,
    telemetry: TelemetryRecorder,
}

impl Shared {
    fn publish(&self, repository: &LeadRepository) {
        self.state.send_modify(|state| {
            state.leads = repository.snapshot();
            state.load = repository.state().clone();
            state.revision += 1;
        });
    }

    fn set_feed(&self, feed: FeedStatus) {
        self.state.send_if_modified(|state| {
            if state.feed == feed {
                return false;
            }
            state.feed = feed;
            state.revision += 1;
            true
        });
    }

    fn feed(&self) -> FeedStatus {
        self.state.borrow().feed.clone()
    }

    async fn apply(&self, event: &ChangeEvent) {
        let mut repository = self.repository.lock().await;
        let outcome = repository.apply_change(event);
        if outcome == ChangeOutcome::Ignored {
            debug!(kind = event.kind.as_str(), "Change did not match any lead");
            return;
        }
        debug!(kind = event.kind.as_str(), outcome = ?outcome, "Applied change");
        self.telemetry.record_change(event.kind);
        self.telemetry.record_snapshot_size(repository.len());
        self.publish(&repository);
    }

    async fn poll_once(&self, source: &dyn LeadSource, limit: Duration) {
        let timer = OperationTimer::new("poll_leads");
        let rows = match fetch_with_timeout(source, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Poll fetch failed, keeping current snapshot");
                self.telemetry.record_fetch_failure(timer.elapsed());
                return;
            },
        };

        let mut repository = self.repository.lock().await;
        if !repository.state().is_ready() {
            let count = repository.load_all(rows);
            info!(count, "Recovered lead snapshot from poll");
            self.telemetry.record_load(count, timer.elapsed());
            self.publish(&repository);
            return;
        }

        let events = diff_snapshot(&repository.snapshot(), rows);
        if events.is_empty() {
            return;
        }
        for event in &events {
            if repository.apply_change(event) != ChangeOutcome::Ignored {
                self.telemetry.record_change(event.kind);
            }
        }
        info!(changes = events.len(), "Applied polled changes");
        self.telemetry.record_snapshot_size(repository.len());
        self.publish(&repository);
    }
}

/// Owner of the lead repository and its background listener
pub struct LeadSync {
    source: Arc<dyn LeadSource>,
    strategy: SyncStrategy,
    options: SyncOptions,
    shared: Arc<Shared>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for LeadSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeadSync")
            .field("strategy", &self.strategy)
            .field("options", &self.options)
            .field("listening", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl LeadSync {
    /// Construct with an empty, not-yet-loaded repository
    pub fn create(source: Arc<dyn LeadSource>, strategy: SyncStrategy, options: SyncOptions) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            source,
            strategy,
            options,
            shared: Arc::new(Shared {
                repository: Mutex::new(LeadRepository::new()),
                state,
                telemetry: TelemetryRecorder::default(),
            }),
            shutdown: None,
            task: None,
        }
    }

    /// Strategy selected from `sync.*` config; a push feed must be supplied by the host
    pub fn strategy_from_config(config: &AppConfig, feed: Option<Arc<dyn ChangeFeed>>) -> Result<SyncStrategy> {
        match (config.sync.strategy.as_str(), feed) {
            ("push", Some(feed)) => Ok(SyncStrategy::Push(feed)),
            ("push", None) => Err(LeadError::InvalidConfig("push strategy needs a change feed".into())),
            ("poll", _) => Ok(SyncStrategy::Poll(Duration::from_secs(config.sync.poll_interval_secs))),
            ("static", _) => Ok(SyncStrategy::Static),
            (other, _) => Err(LeadError::InvalidConfig(format!("unknown sync strategy: {other}"))),
        }
    }

    /// Fetch every row and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept, the load state becomes
    /// [`LoadState::Failed`] and the error is also returned.
    pub async fn load_all(&self) -> Result<usize> {
        let timer = OperationTimer::new("load_leads");
        let fetched = fetch_with_timeout(self.source.as_ref(), self.options.fetch_timeout).await;

        let mut repository = self.shared.repository.lock().await;
        match fetched {
            Ok(rows) => {
                let count = repository.load_all(rows);
                self.shared.telemetry.record_load(count, timer.elapsed());
                self.shared.publish(&repository);
                info!(
                    count,
                    table = %self.options.table,
                    ignored_columns = repository.unrecognized_columns().len(),
                    "Loaded leads"
                );
                timer.finish();
                Ok(count)
            },
            Err(e) => {
                warn!(error = %e, "Lead fetch failed, keeping previous snapshot");
                self.shared.telemetry.record_fetch_failure(timer.elapsed());
                repository.mark_failed(&e);
                self.shared.publish(&repository);
                Err(e)
            },
        }
    }

    /// Start the background listener for the configured strategy.
    ///
    /// Never fails: a push subscription error is reported as
    /// [`FeedStatus::Failed`] and the snapshot stays static. Calling it again
    /// while a listener runs is a no-op.
    pub async fn subscribe(&mut self) -> FeedStatus {
        if self.task.is_some() {
            return self.shared.feed();
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Status is published before the listener starts so a listener that
        // ends immediately always has the last word.
        match &self.strategy {
            SyncStrategy::Static => self.shared.set_feed(FeedStatus::Inactive),
            SyncStrategy::Push(feed) => match feed.subscribe(&self.options.table).await {
                Ok(subscription) => {
                    self.shared.set_feed(FeedStatus::Subscribed);
                    self.task = Some(tokio::spawn(run_push(Arc::clone(&self.shared), subscription, shutdown_rx)));
                },
                Err(e) => {
                    warn!(error = %e, table = %self.options.table, "Change feed unavailable, staying on static snapshot");
                    self.shared.telemetry.record_subscription_failure();
                    self.shared.set_feed(FeedStatus::Failed(e.to_string()));
                },
            },
            SyncStrategy::Poll(every) => {
                self.shared.set_feed(FeedStatus::Polling);
                self.task = Some(tokio::spawn(run_poll(
                    Arc::clone(&self.shared),
                    Arc::clone(&self.source),
                    *every,
                    self.options.fetch_timeout,
                    shutdown_rx,
                )));
            },
        }

        if self.task.is_some() {
            self.shutdown = Some(shutdown_tx);
        }
        let status = self.shared.feed();
        info!(strategy = ?self.strategy, status = ?status, "Subscription started");
        status
    }

    /// Stop the listener and release the feed; the last snapshot stays readable
    pub async fn dispose(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Listener task ended abnormally");
                }
            }
            self.shared.set_feed(FeedStatus::Closed);
            info!("Subscription disposed");
        }
    }

    /// Current snapshot plus status
    #[must_use]
    pub fn state(&self) -> DashboardState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every publish
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DashboardState> {
        self.shared.state.subscribe()
    }

    /// Current immutable snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Lead]> {
        Arc::clone(&self.shared.state.borrow().leads)
    }

    /// Table this instance syncs
    #[must_use]
    pub fn table(&self) -> &str {
        &self.options.table
    }
}

impl Drop for LeadSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn fetch_with_timeout(source: &dyn LeadSource, limit: Duration) -> Result<Vec<RawRecord>> {
    match tokio::time::timeout(limit, source.fetch_all()).await {
        Ok(result) => result,
        Err(_) => Err(LeadError::FetchTimeout(limit.as_secs())),
    }
}

async fn run_push(shared: Arc<Shared>, mut subscription: FeedSubscription, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("Push listener shutting down");
                break;
            }
            event = subscription.next() => match event {
                Some(event) => shared.apply(&event).await,
                None => {
                    warn!("Change feed ended, staying on last snapshot");
                    shared.telemetry.record_subscription_failure();
                    shared.set_feed(FeedStatus::Failed("change feed ended".into()));
                    break;
                }
            }
        }
    }
    subscription.close();
}

async fn run_poll(
    shared: Arc<Shared>,
    source: Arc<dyn LeadSource>,
    every: Duration,
    limit: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; load_all already covered it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("Poll listener shutting down");
                break;
            }
            _ = ticker.tick() => shared.poll_once(source.as_ref(), limit).await,
        }
    }
}
