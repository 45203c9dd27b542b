//! Lead Dashboard - lead-qualification analytics core
//!
//! Normalizes inconsistently shaped call-center lead rows from a hosted
//! backend into canonical leads and derives everything a dashboard renders
//! from them.
//!
//! # Features
//!
//! - Tolerant row adapter with a versioned alias table per field
//! - Single-writer repository with immutable snapshots
//! - Push, poll or static sync strategies with observable status
//! - Funnel metrics, 7-day trend and hour/weekday heatmaps
//! - Autocomplete lead finder
//! - CSV/JSON leads export

/// Raw row normalization
pub mod adapter;
/// Trend and heatmap buckets
pub mod buckets;
/// Configuration management
pub mod config;
/// Display conversions and labels
pub mod display;
/// Error types
pub mod error;
/// Leads-table export
pub mod export;
/// Date and text filtering
pub mod filter;
/// Autocomplete search
pub mod finder;
/// Funnel metrics
pub mod funnel;
/// Logging setup and utilities
pub mod logging;
/// Data models and structures
pub mod models;
/// In-memory lead repository
pub mod repository;
/// Dashboard view composition
pub mod service;
/// Backend fetch and change feeds
pub mod source;
/// Repository lifecycle and live updates
pub mod sync;
/// Metrics recording
pub mod telemetry;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use adapter::normalize;
pub use display::DisplayZone;
pub use error::{LeadError, Result};
pub use filter::LeadQuery;
pub use models::{ChangeEvent, ChangeKind, Closer, DateRange, Lead, MeetingStatus, OutputFormat, RawRecord, Reported};
pub use repository::{LeadRepository, LoadState};
pub use service::{DashboardService, DashboardView};
pub use sync::{DashboardState, FeedStatus, LeadSync, SyncOptions, SyncStrategy};
