//! Backend collaborators: bulk fetch and change-notification feeds
//!
//! The dashboard only needs two things from the hosted backend: every lead
//! row (newest first) and a stream of row changes. Both sit behind traits so
//! the sync layer never knows whether rows come from the REST endpoint, a
//! snapshot file, or an in-process channel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::error::{LeadError, Result};
use crate::models::{ChangeEvent, RawRecord};

/// Bulk access to every lead row
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadSource: Send + Sync {
    /// Fetch all lead rows ordered by creation time, newest first
    async fn fetch_all(&self) -> Result<Vec<RawRecord>>;
}

/// Push notifications for row changes on a logical table
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Establish the subscription; failure means "no live updates", never fatal
    async fn subscribe(&self, table: &str) -> Result<FeedSubscription>;
}

/// An established change subscription.
///
/// Dropping it (or calling [`FeedSubscription::close`]) stops the task that
/// pumps events out of the backend connection.
#[derive(Debug)]
pub struct FeedSubscription {
    events: mpsc::Receiver<ChangeEvent>,
    pump: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    /// Wrap a receiver whose sender is owned elsewhere
    #[must_use]
    pub const fn new(events: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { events, pump: None }
    }

    /// Wrap a receiver fed by `pump`; the task is aborted on close
    #[must_use]
    pub const fn with_pump(events: mpsc::Receiver<ChangeEvent>, pump: JoinHandle<()>) -> Self {
        Self { events, pump: Some(pump) }
    }

    /// Next change, or `None` once the feed has ended
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Tear the subscription down
    pub fn close(&mut self) {
        self.events.close();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// REST access to the hosted backend (`/rest/v1/<table>`)
#[derive(Debug, Clone)]
pub struct RestSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestSource {
    /// Build a client for the configured backend
    pub fn new(config: &BackendConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(LeadError::InvalidConfig("backend.url is required for the REST source".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
        })
    }

    /// URL of the "all rows, newest first" query
    #[must_use]
    pub fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}?select=*&order=created_at.desc", self.base_url, self.table)
    }
}

#[async_trait]
impl LeadSource for RestSource {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let url = self.rows_url();
        debug!(url = %url, "Fetching lead rows");

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadError::Fetch(format!("{status} from {}: {body}", self.table)));
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(into_records(rows))
    }
}

/// Lead rows read from a JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Read rows from `path` on every fetch
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LeadSource for JsonFileSource {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LeadError::Fetch(format!("reading {}: {e}", self.path.display())))?;
        let rows: Vec<Value> = serde_json::from_str(&data)
            .map_err(|e| LeadError::Fetch(format!("parsing {}: {e}", self.path.display())))?;
        Ok(into_records(rows))
    }
}

fn into_records(rows: Vec<Value>) -> Vec<RawRecord> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            other => {
                warn!(row = %other, "Skipping non-object row");
                None
            },
        })
        .collect()
}

/// In-process push feed; a host bridges its realtime client into the publisher
#[derive(Debug)]
pub struct ChannelFeed {
    receiver: Mutex<Option<mpsc::Receiver<ChangeEvent>>>,
}

/// Sending half of a [`ChannelFeed`]
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    sender: mpsc::Sender<ChangeEvent>,
}

impl ChannelFeed {
    /// Create a feed buffering up to `buffer` undelivered events
    #[must_use]
    pub fn new(buffer: usize) -> (Self, FeedPublisher) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { receiver: Mutex::new(Some(receiver)) }, FeedPublisher { sender })
    }
}

impl FeedPublisher {
    /// Deliver one change; fails once the subscriber is gone
    pub async fn publish(&self, event: ChangeEvent) -> Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| LeadError::Subscription("feed subscriber has gone away".into()))
    }

    /// True once the subscriber has been dropped or closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl ChangeFeed for ChannelFeed {
    async fn subscribe(&self, table: &str) -> Result<FeedSubscription> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| LeadError::Subscription(format!("feed for {table} is already subscribed")))?;
        info!(table, "Subscribed to in-process change feed");
        Ok(FeedSubscription::new(receiver))
    }
}

/// Change events read as JSON lines (`{"eventType": .., "new": .., "old": ..}`)
/// from any async reader, e.g. a realtime bridge piped into stdin.
pub struct JsonLinesFeed<R> {
    reader: Mutex<Option<R>>,
    buffer: usize,
}

impl<R> JsonLinesFeed<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// Feed reading from `reader`, buffering up to `buffer` parsed events
    pub fn new(reader: R, buffer: usize) -> Self {
        Self { reader: Mutex::new(Some(reader)), buffer: buffer.max(1) }
    }
}

#[async_trait]
impl<R> ChangeFeed for JsonLinesFeed<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn subscribe(&self, table: &str) -> Result<FeedSubscription> {
        let reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| LeadError::Subscription(format!("feed for {table} is already subscribed")))?;

        let (sender, receiver) = mpsc::channel(self.buffer);
        let pump = tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {},
                    Ok(Some(line)) => match serde_json::from_str::<ChangeEvent>(&line) {
                        Ok(event) => {
                            if sender.send(event).await.is_err() {
                                break;
                            }
                        },
                        Err(e) => warn!(error = %e, "Skipping malformed change line"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Change feed reader failed");
                        break;
                    },
                }
            }
            debug!("Change feed reader finished");
        });

        info!(table, "Subscribed to JSON-lines change feed");
        Ok(FeedSubscription::with_pump(receiver, pump))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeKind;

    #[tokio::test]
    async fn test_channel_feed_subscribes_once() {
        let (feed, _publisher) = ChannelFeed::new(4);
        assert!(feed.subscribe("Retell_Leads").await.is_ok());
        assert!(matches!(feed.subscribe("Retell_Leads").await, Err(LeadError::Subscription(_))));
    }

    #[tokio::test]
    async fn test_json_lines_feed_skips_malformed_lines() {
        let input: &[u8] = b"{\"eventType\":\"INSERT\",\"new\":{\"id\":1}}\nnot json\n\n{\"eventType\":\"DELETE\",\"old\":{\"id\":1}}\n";
        let feed = JsonLinesFeed::new(input, 8);
        let mut subscription = feed.subscribe("Retell_Leads").await.unwrap();

        assert_eq!(subscription.next().await.map(|e| e.kind), Some(ChangeKind::Insert));
        assert_eq!(subscription.next().await.map(|e| e.kind), Some(ChangeKind::Delete));
        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn test_rest_source_requires_url() {
        let config = BackendConfig::default();
        assert!(matches!(RestSource::new(&config), Err(LeadError::InvalidConfig(_))));
    }

    #[test]
    fn test_rows_url_orders_newest_first() {
        let config = BackendConfig { url: "https://example.supabase.co/".into(), ..BackendConfig::default() };
        let source = RestSource::new(&config).unwrap();
        assert_eq!(
            source.rows_url(),
            "https://example.supabase.co/rest/v1/Retell_Leads?select=*&order=created_at.desc"
        );
    }
}
