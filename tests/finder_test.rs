//! Tests for the autocomplete lead finder

use lead_dashboard::adapter::normalize;
use lead_dashboard::finder::{search, LeadFinder, DEFAULT_LIMIT};
use lead_dashboard::models::Lead;
use serde_json::json;

fn lead(id: i64, name: &str, email: &str) -> Lead {
    let row = json!({"id": id, "Nome": name, "email_lead": email});
    normalize(row.as_object().expect("object"))
}

fn many_matches() -> Vec<Lead> {
    (1..=15).map(|i| lead(i, &format!("Silva {i}"), &format!("silva{i}@mail.com"))).collect()
}

#[test]
fn test_search_caps_results_in_snapshot_order() {
    let leads = many_matches();
    let results = search(&leads, "silva", DEFAULT_LIMIT);

    assert_eq!(results.len(), 10);
    assert_eq!(results.iter().map(|l| l.id).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
}

#[test]
fn test_empty_term_returns_nothing() {
    let leads = many_matches();
    assert!(search(&leads, "", DEFAULT_LIMIT).is_empty());
    assert!(search(&leads, "   ", DEFAULT_LIMIT).is_empty());
}

#[test]
fn test_search_matches_id() {
    let leads = vec![lead(1207, "Ana", "ana@mail.com"), lead(88, "Bia", "bia@mail.com")];
    let results = search(&leads, "120", DEFAULT_LIMIT);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 1207);
}

#[test]
fn test_select_is_idempotent_and_sets_term() {
    let leads = many_matches();
    let mut finder = LeadFinder::default();
    finder.set_term("silva 3");

    let chosen = finder.results(&leads)[0].clone();
    finder.select(&chosen);
    let first = finder.selected_lead(&leads).cloned();
    finder.select(&chosen);

    assert_eq!(finder.term(), "silva3@mail.com");
    assert_eq!(finder.selected_lead(&leads).cloned(), first);
    assert_eq!(finder.selected_id(), Some(3));
}

#[test]
fn test_clear_deselects() {
    let leads = many_matches();
    let mut finder = LeadFinder::new(5);
    finder.set_term("silva");
    assert_eq!(finder.results(&leads).len(), 5);

    finder.select(&leads[0]);
    finder.clear();

    assert_eq!(finder.term(), "");
    assert!(finder.selected_lead(&leads).is_none());
    assert!(finder.results(&leads).is_empty());
}

#[test]
fn test_selected_lead_disappears_when_removed() {
    let mut leads = many_matches();
    let mut finder = LeadFinder::default();
    finder.select(&leads[4]);
    leads.remove(4);
    assert!(finder.selected_lead(&leads).is_none());
}
