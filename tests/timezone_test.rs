//! Local display zone across daylight-saving changes.
//!
//! Kept in its own test binary with a single test: it sets `TZ` for the
//! whole process before the local zone is first read.

use chrono::{DateTime, NaiveDate, Utc};
use lead_dashboard::adapter::normalize;
use lead_dashboard::buckets::{daily_trend, hourly_heatmap, weekday_heatmap};
use lead_dashboard::config::parse_timezone;
use lead_dashboard::display::{format_date, DisplayZone};
use lead_dashboard::models::{DateRange, Lead};
use serde_json::json;

fn lead(id: i64, created_at: &str) -> Lead {
    let row = json!({"id": id, "created_at": created_at, "tentativas": 1, "atendido": "Sim"});
    normalize(row.as_object().expect("object"))
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn at(value: &str) -> DateTime<Utc> {
    value.parse().expect("valid timestamp")
}

#[test]
fn test_local_zone_follows_daylight_saving() {
    // US Eastern: UTC-5 in winter, UTC-4 from March to November
    std::env::set_var("TZ", "EST5EDT,M3.2.0,M11.1.0");
    let zone = parse_timezone("local").expect("local zone");
    assert_eq!(zone, DisplayZone::Local);

    let winter_noon = at("2026-01-15T12:00:00Z");
    let summer_noon = at("2026-07-15T12:00:00Z");
    assert_eq!(zone.offset_at(&winter_noon).local_minus_utc(), -5 * 3600);
    assert_eq!(zone.offset_at(&summer_noon).local_minus_utc(), -4 * 3600);

    // Each instant lands in its own local hour
    let heatmap = hourly_heatmap(&[lead(1, "2026-01-15T12:00:00Z"), lead(2, "2026-07-15T12:00:00Z")], &zone);
    assert_eq!(heatmap.cells[7].calls, 1);
    assert_eq!(heatmap.cells[8].calls, 1);

    // Late-evening calls fall on the previous local day and weekday
    let winter_late = lead(3, "2026-01-15T04:30:00Z");
    let trend = daily_trend(std::slice::from_ref(&winter_late), day(2026, 1, 15), &zone);
    assert_eq!(trend[5].date, day(2026, 1, 14));
    assert_eq!(trend[5].leads, 1);
    assert_eq!(trend[6].leads, 0);

    let summer_late = lead(4, "2026-07-15T03:30:00Z");
    let weekdays = weekday_heatmap(std::slice::from_ref(&summer_late), &zone);
    // 2026-07-14 is a Tuesday
    assert_eq!(weekdays.cells[2].calls, 1);

    assert_eq!(format_date(Some(at("2026-01-15T04:30:00Z")), &zone), "14/01/2026 23:30");
    assert_eq!(format_date(Some(at("2026-07-15T03:30:00Z")), &zone), "14/07/2026 23:30");

    // Calendar-day ranges use the offset in effect on each boundary day
    let range = DateRange::from_days(day(2026, 3, 1), day(2026, 3, 31), &zone);
    assert_eq!(range.start, Some(at("2026-03-01T05:00:00Z")));
    assert_eq!(range.end.map(|end| end.to_rfc3339()), Some("2026-04-01T03:59:59.999999999+00:00".to_string()));
}
