use super::palette::ChartData;
use super::stats::{
    color_breakdown, date_breakdown, event_count_by_color, event_hours, filter_by_substring,
    gap_hours_by_day, longest_events, DayBreakdown,
};
use crate::components::event_store::models::{DateRange, Event};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

/// A longest event with its duration in hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongestEvent {
    pub event: Event,
    pub duration: f64,
}

/// Everything the dashboard shows, derived from one event list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedSummary {
    pub date_range: Option<DateRange>,
    pub default_color_id: Option<String>,
    pub query: String,
    pub total_events: usize,
    pub total_hours: f64,
    pub color_breakdown: BTreeMap<String, f64>,
    pub event_counts: BTreeMap<String, usize>,
    pub days: Vec<DayBreakdown>,
    pub gap_hours: f64,
    pub gap_hours_by_day: BTreeMap<NaiveDate, f64>,
    pub longest_events: Vec<LongestEvent>,
    pub chart: ChartData,
    /// Events matching `query`, ordered by start
    pub timeline: Vec<Event>,
}

impl WrappedSummary {
    /// Run every aggregation over `events`.
    ///
    /// The statistics always cover the whole list; `query` narrows only the
    /// timeline. All-day dates are measured from midnight in `tz`.
    pub fn build(
        events: &[Event],
        tz: Tz,
        date_range: Option<DateRange>,
        default_color_id: Option<&str>,
        query: &str,
    ) -> Self {
        let breakdown = color_breakdown(events, tz);
        let gaps = gap_hours_by_day(events, tz);
        let chart = ChartData::from_breakdown(&breakdown).with_default_color(default_color_id);

        let mut timeline: Vec<Event> = filter_by_substring(events, query)
            .into_iter()
            .cloned()
            .collect();
        timeline.sort_by_key(|e| e.start.instant(tz));

        Self {
            date_range,
            default_color_id: default_color_id.map(str::to_string),
            query: query.to_string(),
            total_events: events.len(),
            total_hours: events.iter().map(|e| event_hours(e, tz)).sum(),
            color_breakdown: breakdown,
            event_counts: event_count_by_color(events),
            days: date_breakdown(events, tz),
            gap_hours: gaps.values().sum(),
            gap_hours_by_day: gaps,
            longest_events: longest_events(events, tz)
                .into_iter()
                .map(|timed| LongestEvent {
                    event: timed.event.clone(),
                    duration: timed.duration,
                })
                .collect(),
            chart,
            timeline,
        }
    }
}
