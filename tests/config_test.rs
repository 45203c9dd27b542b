//! Tests for layered configuration

use std::io::Write;

use chrono::FixedOffset;
use lead_dashboard::config::{parse_timezone, AppConfig};
use lead_dashboard::display::DisplayZone;

#[test]
fn test_default_backend_config() {
    let config = AppConfig::default();

    assert_eq!(config.backend.url, "");
    assert_eq!(config.backend.table, "Retell_Leads");
    assert_eq!(config.backend.fetch_timeout_secs, 30);
    assert_eq!(config.backend.snapshot_file, None);
}

#[test]
fn test_default_sync_and_dashboard_config() {
    let config = AppConfig::default();

    assert_eq!(config.sync.strategy, "poll");
    assert_eq!(config.sync.poll_interval_secs, 30);
    assert_eq!(config.sync.feed_buffer, 256);
    assert_eq!(config.dashboard.finder_limit, 10);
    assert_eq!(config.dashboard.timezone, "local");
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_load_from_file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("temp file");
    writeln!(
        file,
        r#"
[backend]
url = "https://example.supabase.co"
api_key = "anon-key"
fetch_timeout_secs = 10

[sync]
strategy = "static"

[dashboard]
timezone = "-03:00"
finder_limit = 5
"#
    )
    .expect("write config");

    let config = AppConfig::load_from(file.path()).expect("config loads");

    assert_eq!(config.backend.url, "https://example.supabase.co");
    assert_eq!(config.backend.fetch_timeout_secs, 10);
    assert_eq!(config.backend.table, "Retell_Leads");
    assert_eq!(config.sync.strategy, "static");
    assert_eq!(config.dashboard.finder_limit, 5);
    assert_eq!(
        config.dashboard.display_zone().expect("zone"),
        DisplayZone::Fixed(FixedOffset::west_opt(3 * 3600).expect("offset"))
    );
}

#[test]
fn test_invalid_file_values_are_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("temp file");
    writeln!(file, "[logging]\nlevel = \"verbose\"").expect("write config");

    assert!(AppConfig::load_from(file.path()).is_err());
}

#[test]
fn test_validation_rules() {
    let mut config = AppConfig::default();
    config.backend.url = "ftp://example.com".into();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.backend.fetch_timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.dashboard.finder_limit = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.dashboard.timezone = "somewhere".into();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.format = "yaml".into();
    assert!(config.validate().is_err());
}

#[test]
fn test_timezone_forms() {
    assert_eq!(
        parse_timezone("+05:30").expect("offset"),
        DisplayZone::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).expect("offset"))
    );
    assert_eq!(parse_timezone("Z").expect("utc"), DisplayZone::utc());
    assert_eq!(parse_timezone("local").expect("local"), DisplayZone::Local);
}
