use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::models::ChangeKind;

/// Metric names recorded by the sync layer.
///
/// Without a globally installed recorder every call is a no-op, so the
/// library can record unconditionally and let the host decide on export.
#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    /// Counter of leads loaded by bulk fetches
    pub leads_loaded_total: &'static str,
    /// Counter of applied change events, labelled by kind
    pub change_events_total: &'static str,
    /// Counter of failed bulk fetches
    pub fetch_failures_total: &'static str,
    /// Counter of failed or ended subscriptions
    pub subscription_failures_total: &'static str,
    /// Gauge of leads in the current snapshot
    pub snapshot_size: &'static str,
    /// Histogram of bulk fetch durations in seconds
    pub fetch_duration: &'static str,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self {
            leads_loaded_total: "lead_dashboard_leads_loaded_total",
            change_events_total: "lead_dashboard_change_events_total",
            fetch_failures_total: "lead_dashboard_fetch_failures_total",
            subscription_failures_total: "lead_dashboard_subscription_failures_total",
            snapshot_size: "lead_dashboard_snapshot_size",
            fetch_duration: "lead_dashboard_fetch_duration_seconds",
        }
    }
}

impl TelemetryRecorder {
    /// Record a successful bulk load
    pub fn record_load(&self, count: usize, duration: Duration) {
        counter!(self.leads_loaded_total).increment(count as u64);
        histogram!(self.fetch_duration).record(duration.as_secs_f64());
        self.record_snapshot_size(count);
    }

    /// Record a failed bulk fetch
    pub fn record_fetch_failure(&self, duration: Duration) {
        counter!(self.fetch_failures_total).increment(1);
        histogram!(self.fetch_duration).record(duration.as_secs_f64());
    }

    /// Record one applied change event
    pub fn record_change(&self, kind: ChangeKind) {
        counter!(self.change_events_total, "kind" => kind.as_str()).increment(1);
    }

    /// Record a failed or broken subscription
    pub fn record_subscription_failure(&self) {
        counter!(self.subscription_failures_total).increment(1);
    }

    /// Update the snapshot size gauge
    pub fn record_snapshot_size(&self, size: usize) {
        gauge!(self.snapshot_size).set(size as f64);
    }
}
