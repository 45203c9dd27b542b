//! Funnel counts, rates and cost/duration rollups over a filtered view

use serde::Serialize;

use crate::display::{percent, ratio};
use crate::models::Lead;

/// One step of the attempts → answered → meetings funnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStageKind {
    /// Every call attempt
    Attempts,
    /// Leads that picked up
    Answered,
    /// Leads with a scheduled meeting
    Meetings,
}

impl FunnelStageKind {
    /// Chart label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attempts => "Attempts",
            Self::Answered => "Answered",
            Self::Meetings => "Meetings",
        }
    }
}

/// One funnel bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    /// Which step this is
    pub stage: FunnelStageKind,
    /// Attempts, answered leads or meetings
    pub count: u64,
    /// Percentage of the top stage (attempts)
    pub share_of_top: f64,
    /// Percentage of the previous stage
    pub from_previous: f64,
}

/// Aggregates over one lead view.
///
/// Totals are exact integers; `*_rate` fields are percentages rounded to one
/// decimal; averages are unrounded. Every ratio with a zero denominator is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelMetrics {
    /// Leads in the view
    pub total_leads: u64,
    /// Leads with at least one attempt
    pub contacted_leads: u64,
    /// Sum of attempts
    pub total_attempts: u64,
    /// Leads that answered
    pub answered_count: u64,
    /// Leads with a scheduled meeting
    pub meetings_scheduled_count: u64,
    /// answered / attempts
    pub answer_rate: f64,
    /// meetings / answered
    pub conversion_rate: f64,
    /// meetings / leads
    pub lead_conversion_rate: f64,
    /// attempts / leads
    pub avg_attempts_per_lead: f64,
    /// Sum of reported call costs
    pub total_cost_cents: u64,
    /// Leads with a reported cost
    pub costed_calls: u64,
    /// total cost / costed calls
    pub avg_cost_cents_per_costed_call: f64,
    /// Sum of reported call durations
    pub total_duration_seconds: u64,
    /// Leads with a reported duration
    pub timed_calls: u64,
    /// total duration / timed calls
    pub avg_duration_seconds_per_timed_call: f64,
    /// Attempts, answered, meetings
    pub stages: Vec<FunnelStage>,
}

#[derive(Default)]
struct Totals {
    leads: u64,
    contacted: u64,
    attempts: u64,
    answered: u64,
    meetings: u64,
    cost_cents: u64,
    costed: u64,
    duration_seconds: u64,
    timed: u64,
}

/// Compute funnel metrics for `leads`
#[must_use]
pub fn aggregate(leads: &[Lead]) -> FunnelMetrics {
    let mut totals = Totals::default();
    for lead in leads {
        totals.leads += 1;
        totals.attempts += u64::from(lead.attempts);
        if lead.was_contacted() {
            totals.contacted += 1;
        }
        if lead.was_answered {
            totals.answered += 1;
        }
        if lead.meeting.is_scheduled() {
            totals.meetings += 1;
        }
        // Absent cost/duration contributes nothing to sums or averages.
        if let Some(cents) = lead.call_cost_cents {
            totals.cost_cents += cents;
            totals.costed += 1;
        }
        if let Some(seconds) = lead.call_duration_seconds {
            totals.duration_seconds += seconds;
            totals.timed += 1;
        }
    }

    FunnelMetrics {
        total_leads: totals.leads,
        contacted_leads: totals.contacted,
        total_attempts: totals.attempts,
        answered_count: totals.answered,
        meetings_scheduled_count: totals.meetings,
        answer_rate: percent(totals.answered, totals.attempts),
        conversion_rate: percent(totals.meetings, totals.answered),
        lead_conversion_rate: percent(totals.meetings, totals.leads),
        avg_attempts_per_lead: ratio(totals.attempts, totals.leads),
        total_cost_cents: totals.cost_cents,
        costed_calls: totals.costed,
        avg_cost_cents_per_costed_call: ratio(totals.cost_cents, totals.costed),
        total_duration_seconds: totals.duration_seconds,
        timed_calls: totals.timed,
        avg_duration_seconds_per_timed_call: ratio(totals.duration_seconds, totals.timed),
        stages: stages(&totals),
    }
}

fn stages(totals: &Totals) -> Vec<FunnelStage> {
    vec![
        FunnelStage {
            stage: FunnelStageKind::Attempts,
            count: totals.attempts,
            share_of_top: percent(totals.attempts, totals.attempts),
            from_previous: percent(totals.attempts, totals.attempts),
        },
        FunnelStage {
            stage: FunnelStageKind::Answered,
            count: totals.answered,
            share_of_top: percent(totals.answered, totals.attempts),
            from_previous: percent(totals.answered, totals.attempts),
        },
        FunnelStage {
            stage: FunnelStageKind::Meetings,
            count: totals.meetings,
            share_of_top: percent(totals.meetings, totals.attempts),
            from_previous: percent(totals.meetings, totals.answered),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_view_has_zero_rates() {
        let metrics = aggregate(&[]);
        assert_eq!(metrics.answer_rate, 0.0);
        assert_eq!(metrics.conversion_rate, 0.0);
        assert_eq!(metrics.avg_cost_cents_per_costed_call, 0.0);
        assert_eq!(metrics.stages.len(), 3);
        assert!(metrics.stages.iter().all(|s| s.share_of_top == 0.0));
    }
}
