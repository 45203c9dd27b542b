//! Tests for dashboard view composition

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use lead_dashboard::config::AppConfig;
use lead_dashboard::source::JsonFileSource;
use lead_dashboard::sync::FeedStatus;
use lead_dashboard::{DashboardService, DateRange, LeadQuery, LoadState};

const ROWS: &str = r#"[
    {"id": 1, "created_at": "2025-05-27T12:00:00Z", "Nome": "Ana", "tentativas": "3", "atendido": "Sim",
     "Reuniao_marcada?": "Sim", "Custo_total": 4500, "Duracao": 180},
    {"id": 2, "created_at": "2025-05-28T15:00:00Z", "Nome": "Bruno", "tentativas": "1", "atendido": "Não",
     "Reuniao_marcada?": "—"},
    {"id": 3, "created_at": "2025-04-01T09:00:00Z", "Nome": "Carla", "tentativas": 2}
]"#;

fn static_config(path: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.strategy = "static".into();
    config.dashboard.timezone = "UTC".into();
    config.backend.snapshot_file = Some(path.to_string_lossy().into_owned());
    config
}

async fn started_service() -> (tempfile::TempDir, DashboardService) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("leads.json");
    std::fs::write(&path, ROWS).expect("write rows");

    let config = static_config(&path);
    let mut service =
        DashboardService::from_config(&config, Arc::new(JsonFileSource::new(&path)), None).expect("service");
    assert_eq!(service.start().await, FeedStatus::Inactive);
    (dir, service)
}

#[tokio::test]
async fn test_view_over_whole_snapshot() {
    let (_dir, service) = started_service().await;
    let today = NaiveDate::from_ymd_opt(2025, 5, 28).expect("date");

    let view = service.view_at(&LeadQuery::default(), today);

    assert_eq!(view.load, LoadState::Ready);
    assert_eq!(view.snapshot_size, 3);
    assert_eq!(view.leads.iter().map(|l| l.id).collect::<Vec<_>>(), vec![2, 1, 3]);
    assert_eq!(view.metrics.total_attempts, 6);
    assert_eq!(view.trend.len(), 7);
    assert_eq!(view.trend[6].leads, 1);
    assert_eq!(view.trend[5].leads, 1);
    assert_eq!(view.hourly.cells.len(), 24);
    assert_eq!(view.weekday.cells.len(), 7);
}

#[tokio::test]
async fn test_view_applies_query_before_aggregating() {
    let (_dir, service) = started_service().await;
    let utc = FixedOffset::east_opt(0).expect("offset");
    let may = DateRange::from_days(
        NaiveDate::from_ymd_opt(2025, 5, 1).expect("date"),
        NaiveDate::from_ymd_opt(2025, 5, 31).expect("date"),
        &utc,
    );

    let view = service.view_at(&LeadQuery { date_range: may, search: Some("ana".into()) }, NaiveDate::from_ymd_opt(2025, 5, 28).expect("date"));

    assert_eq!(view.leads.len(), 1);
    assert_eq!(view.metrics.answer_rate, 33.3);
    assert_eq!(view.metrics.conversion_rate, 100.0);
    assert_eq!(view.snapshot_size, 3);
}

#[tokio::test]
async fn test_find_uses_finder_limit() {
    let (_dir, service) = started_service().await;
    assert_eq!(service.find("a").len(), 2);
    assert!(service.find("").is_empty());
    assert_eq!(service.finder_limit(), 10);
}

#[tokio::test]
async fn test_missing_snapshot_still_builds_empty_view() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let config = static_config(&path);

    let mut service =
        DashboardService::from_config(&config, Arc::new(JsonFileSource::new(&path)), None).expect("service");
    service.start().await;
    let view = service.view(&LeadQuery::default());

    assert!(matches!(view.load, LoadState::Failed(_)));
    assert!(view.leads.is_empty());
    assert_eq!(view.metrics.answer_rate, 0.0);
    assert_eq!(view.hourly.cells.len(), 24);
}

#[test]
fn test_push_without_feed_is_config_error() {
    let mut config = AppConfig::default();
    config.sync.strategy = "push".into();
    let source = Arc::new(JsonFileSource::new("leads.json"));
    assert!(DashboardService::from_config(&config, source, None).is_err());
}
