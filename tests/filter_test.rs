//! Tests for date and text filtering

use chrono::{DateTime, Duration, TimeZone, Utc};
use lead_dashboard::adapter::normalize;
use lead_dashboard::filter::{filter, LeadQuery};
use lead_dashboard::models::{DateRange, Lead};
use proptest::prelude::*;
use serde_json::json;

fn lead_at(id: i64, created_at: DateTime<Utc>, name: &str) -> Lead {
    let row = json!({"id": id, "created_at": created_at.to_rfc3339(), "Nome": name, "email_lead": format!("lead{id}@mail.com")});
    normalize(row.as_object().expect("object"))
}

fn sample() -> Vec<Lead> {
    let base = Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).single().expect("valid date");
    vec![
        lead_at(3, base + Duration::days(2), "Carla"),
        lead_at(2, base + Duration::days(1), "Bruno"),
        lead_at(1, base, "Ana Carla"),
    ]
}

fn ids(leads: &[Lead]) -> Vec<i64> {
    leads.iter().map(|lead| lead.id).collect()
}

#[test]
fn test_empty_query_returns_everything_in_order() {
    let leads = sample();
    assert_eq!(ids(&filter(&leads, &LeadQuery::default())), vec![3, 2, 1]);
}

#[test]
fn test_date_range_is_inclusive_on_both_ends() {
    let leads = sample();
    let range = DateRange::between(leads[1].created_at, leads[0].created_at);
    assert_eq!(ids(&filter(&leads, &LeadQuery::within(range))), vec![3, 2]);
}

#[test]
fn test_half_open_range_does_not_filter() {
    let leads = sample();
    let query = LeadQuery::within(DateRange { start: Some(leads[0].created_at), end: None });
    assert_eq!(filter(&leads, &query).len(), 3);
}

#[test]
fn test_search_and_date_compose_with_and() {
    let leads = sample();
    let query = LeadQuery {
        date_range: DateRange::between(leads[2].created_at, leads[1].created_at),
        search: Some("carla".into()),
    };
    assert_eq!(ids(&filter(&leads, &query)), vec![1]);
}

#[test]
fn test_search_keeps_input_order() {
    let leads = sample();
    assert_eq!(ids(&filter(&leads, &LeadQuery::search("CARLA"))), vec![3, 1]);
}

fn arb_leads() -> impl Strategy<Value = Vec<Lead>> {
    proptest::collection::vec((0_i64..10_000, 0_i64..1_000_000, "[a-z]{0,8}"), 0..20).prop_map(|rows| {
        rows.into_iter()
            .map(|(id, secs, name)| lead_at(id, DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs), &name))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_excluding_range_then_search_is_empty(leads in arb_leads(), term in "[a-z]{0,4}") {
        let far_future = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).single().expect("valid date");
        let range = DateRange::between(far_future, far_future + Duration::days(1));
        let dated = filter(&leads, &LeadQuery::within(range));
        prop_assert!(filter(&dated, &LeadQuery::search(term)).is_empty());
    }

    #[test]
    fn prop_empty_search_after_date_filter_is_noop(leads in arb_leads(), start in 0_i64..500_000, len in 0_i64..500_000) {
        let from = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(start);
        let range = DateRange::between(from, from + Duration::seconds(len));
        let dated = filter(&leads, &LeadQuery::within(range));
        prop_assert_eq!(filter(&dated, &LeadQuery::search("")), dated.clone());
    }

    #[test]
    fn prop_filter_result_is_subsequence(leads in arb_leads(), term in "[a-z]{1,2}") {
        let result = filter(&leads, &LeadQuery::search(term));
        let mut remaining = leads.iter();
        for lead in &result {
            prop_assert!(remaining.any(|candidate| candidate == lead));
        }
    }
}
