//! Pure aggregation passes over a list of events.
//!
//! None of these functions touch the event store; they take a slice and
//! return a derived view. Day grouping uses the calendar date of each start:
//! the timestamp's date in the offset it carries (the configured zone for
//! everything fetched through the calendar client) or the all-day date.
//! Durations resolve all-day dates to midnight in `tz`.

use crate::components::event_store::models::Event;
use crate::utils::time::day_label;
use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Durations closer than this many hours count as a tie
pub const LONGEST_TIE_TOLERANCE: f64 = 0.01;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// `end - start` in fractional hours. Negative when `end < start`.
pub fn duration_hours(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    end.signed_duration_since(*start).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Duration of a single event in hours
pub fn event_hours(event: &Event, tz: Tz) -> f64 {
    duration_hours(&event.start.instant(tz), &event.end.instant(tz))
}

/// Total hours per color category
pub fn color_breakdown(events: &[Event], tz: Tz) -> BTreeMap<String, f64> {
    events.iter().fold(BTreeMap::new(), |mut acc, event| {
        *acc.entry(event.color_key().to_string()).or_insert(0.0) += event_hours(event, tz);
        acc
    })
}

/// Number of events per color category
pub fn event_count_by_color(events: &[Event]) -> BTreeMap<String, usize> {
    events.iter().fold(BTreeMap::new(), |mut acc, event| {
        *acc.entry(event.color_key().to_string()).or_insert(0) += 1;
        acc
    })
}

/// Idle hours between consecutive events, per start date.
///
/// Each day is sorted by start instant (stable, so ties keep input order)
/// and every consecutive pair contributes `max(0, next.start - prev.end)`.
pub fn gap_hours_by_day(events: &[Event], tz: Tz) -> BTreeMap<NaiveDate, f64> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
    for event in events {
        by_day
            .entry(event.start.local_date())
            .or_default()
            .push(event);
    }

    by_day
        .into_iter()
        .map(|(day, mut day_events)| {
            day_events.sort_by_key(|e| e.start.instant(tz));
            let gap = day_events
                .windows(2)
                .map(|pair| {
                    duration_hours(&pair[0].end.instant(tz), &pair[1].start.instant(tz)).max(0.0)
                })
                .sum();
            (day, gap)
        })
        .collect()
}

/// Total idle hours between same-day events
pub fn daily_gaps(events: &[Event], tz: Tz) -> f64 {
    gap_hours_by_day(events, tz).values().sum()
}

/// Per-day totals keyed by a short day label
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBreakdown {
    pub label: String,
    pub count: usize,
    pub hours: f64,
    pub color_hours: BTreeMap<String, f64>,
    pub dominant_color: String,
    #[serde(skip)]
    dominant_hours: f64,
}

impl DayBreakdown {
    /// A day seeded with its first event, whose color starts out dominant
    fn new(label: String, color: &str, hours: f64) -> Self {
        Self {
            label,
            count: 1,
            hours,
            color_hours: BTreeMap::from([(color.to_string(), hours)]),
            dominant_color: color.to_string(),
            dominant_hours: hours,
        }
    }

    fn add(&mut self, color: &str, hours: f64) {
        self.count += 1;
        self.hours += hours;
        let color_total = {
            let total = self.color_hours.entry(color.to_string()).or_insert(0.0);
            *total += hours;
            *total
        };

        // Only a strictly larger total takes over
        if color_total > self.dominant_hours {
            self.dominant_hours = color_total;
            self.dominant_color = color.to_string();
        }
    }
}

/// Fold events into per-day totals in order of first appearance.
///
/// Days are keyed by their "Mon D" label, so the same month and day in two
/// different years share an entry.
pub fn date_breakdown(events: &[Event], tz: Tz) -> Vec<DayBreakdown> {
    let mut days: Vec<DayBreakdown> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for event in events {
        let label = day_label(event.start.local_date());
        let (color, hours) = (event.color_key(), event_hours(event, tz));
        match index.get(&label) {
            Some(&slot) => days[slot].add(color, hours),
            None => {
                index.insert(label.clone(), days.len());
                days.push(DayBreakdown::new(label, color, hours));
            }
        }
    }

    days
}

/// An event together with its duration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent<'a> {
    pub event: &'a Event,
    pub duration: f64,
}

/// The longest event(s), ties within [`LONGEST_TIE_TOLERANCE`] included.
///
/// The first event to set the maximum comes first, followed by its ties in
/// input order. A strictly longer event outside the tolerance resets the set.
pub fn longest_events(events: &[Event], tz: Tz) -> Vec<TimedEvent<'_>> {
    let mut longest: Vec<TimedEvent<'_>> = Vec::new();
    let mut max = f64::NEG_INFINITY;

    for event in events {
        let duration = event_hours(event, tz);
        if (duration - max).abs() < LONGEST_TIE_TOLERANCE {
            longest.push(TimedEvent { event, duration });
        } else if duration > max {
            max = duration;
            longest.clear();
            longest.push(TimedEvent { event, duration });
        }
    }

    longest
}

/// Events whose summary contains `query`, ignoring case.
/// An empty query keeps everything.
pub fn filter_by_substring<'a>(events: &'a [Event], query: &str) -> Vec<&'a Event> {
    if query.is_empty() {
        return events.iter().collect();
    }

    let needle = query.to_lowercase();
    events
        .iter()
        .filter(|event| {
            event
                .summary
                .as_deref()
                .is_some_and(|summary| summary.to_lowercase().contains(&needle))
        })
        .collect()
}
