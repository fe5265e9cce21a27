use calendar_wrapped::components::event_store::Event;
use calendar_wrapped::components::wrapped::stats::{
    color_breakdown, daily_gaps, date_breakdown, event_count_by_color, event_hours,
    filter_by_substring, longest_events,
};
use calendar_wrapped::components::wrapped::WrappedSummary;
use chrono::{DateTime, Duration};
use chrono_tz::UTC;

fn event(id: &str, start: &str, end: &str) -> Event {
    Event::new(
        id,
        DateTime::parse_from_rfc3339(start).unwrap(),
        DateTime::parse_from_rfc3339(end).unwrap(),
    )
}

/// An event of `hours` starting at 08:00 on the given day
fn lasting(id: &str, day: u32, hours: f64) -> Event {
    let start = DateTime::parse_from_rfc3339(&format!("2024-03-{:02}T08:00:00Z", day)).unwrap();
    let end = start + Duration::milliseconds((hours * 3_600_000.0).round() as i64);
    Event::new(id, start, end)
}

fn sample() -> Vec<Event> {
    vec![
        event("1", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z")
            .with_summary("Planning")
            .with_color("1"),
        event("2", "2024-01-05T10:30:00Z", "2024-01-05T11:00:00Z")
            .with_summary("Coffee")
            .with_color("2"),
        event("3", "2024-01-06T13:00:00Z", "2024-01-06T15:15:00Z").with_summary("Deep work"),
        event("4", "2024-01-06T16:00:00Z", "2024-01-06T16:45:00Z")
            .with_summary("Team sync")
            .with_color("1"),
    ]
}

#[test]
fn test_breakdown_sums_match_total() {
    let events = sample();
    let total: f64 = events.iter().map(|e| event_hours(e, UTC)).sum();

    let breakdown = color_breakdown(&events, UTC);
    let breakdown_total: f64 = breakdown.values().sum();
    assert!((breakdown_total - total).abs() < 1e-9);

    let counts = event_count_by_color(&events);
    assert_eq!(counts.values().sum::<usize>(), events.len());
    assert_eq!(counts["1"], 2);
    assert_eq!(counts["default"], 1);

    let days = date_breakdown(&events, UTC);
    let day_total: f64 = days.iter().map(|d| d.hours).sum();
    let day_count: usize = days.iter().map(|d| d.count).sum();
    assert!((day_total - total).abs() < 1e-9);
    assert_eq!(day_count, events.len());
}

#[test]
fn test_two_event_scenario() {
    let events = vec![
        event("1", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z").with_color("1"),
        event("2", "2024-01-05T10:30:00Z", "2024-01-05T11:00:00Z").with_color("2"),
    ];

    let breakdown = color_breakdown(&events, UTC);
    assert_eq!(breakdown["1"], 1.0);
    assert_eq!(breakdown["2"], 0.5);
    assert_eq!(daily_gaps(&events, UTC), 0.5);

    let longest = longest_events(&events, UTC);
    assert_eq!(longest.len(), 1);
    assert_eq!(longest[0].event.id, "1");
    assert_eq!(longest[0].duration, 1.0);
}

#[test]
fn test_gaps_stay_within_a_day() {
    let same_day = vec![
        event("a", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z"),
        event("b", "2024-01-05T11:00:00Z", "2024-01-05T12:00:00Z"),
    ];
    assert_eq!(daily_gaps(&same_day, UTC), 1.0);

    let across_days = vec![
        event("a", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z"),
        event("b", "2024-01-06T11:00:00Z", "2024-01-06T12:00:00Z"),
    ];
    assert_eq!(daily_gaps(&across_days, UTC), 0.0);

    // Overlapping events never produce a negative gap
    let overlapping = vec![
        event("a", "2024-01-05T09:00:00Z", "2024-01-05T11:00:00Z"),
        event("b", "2024-01-05T10:00:00Z", "2024-01-05T10:30:00Z"),
    ];
    assert_eq!(daily_gaps(&overlapping, UTC), 0.0);

    // Input order does not matter
    let unsorted = vec![
        event("b", "2024-01-05T11:00:00Z", "2024-01-05T12:00:00Z"),
        event("a", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z"),
    ];
    assert_eq!(daily_gaps(&unsorted, UTC), 1.0);
}

#[test]
fn test_gaps_keep_input_order_for_equal_starts() {
    // a and b start together; sorting must not swap them
    let events = vec![
        event("a", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z"),
        event("b", "2024-01-05T09:00:00Z", "2024-01-05T11:00:00Z"),
        event("c", "2024-01-05T10:30:00Z", "2024-01-05T11:30:00Z"),
    ];
    // a->b overlaps, b->c overlaps
    assert_eq!(daily_gaps(&events, UTC), 0.0);

    // With b listed first the pair a->c leaves half an hour
    let swapped = vec![events[1].clone(), events[0].clone(), events[2].clone()];
    assert_eq!(daily_gaps(&swapped, UTC), 0.5);
}

#[test]
fn test_longest_events_ties() {
    let events = vec![lasting("a", 1, 2.0), lasting("b", 2, 3.0), lasting("c", 3, 3.005)];
    let ids: Vec<&str> = longest_events(&events, UTC)
        .iter()
        .map(|t| t.event.id.as_str())
        .collect();
    assert_eq!(ids, vec!["b", "c"]);

    let events = vec![lasting("a", 1, 1.0), lasting("b", 2, 5.0), lasting("c", 3, 2.0)];
    let ids: Vec<&str> = longest_events(&events, UTC)
        .iter()
        .map(|t| t.event.id.as_str())
        .collect();
    assert_eq!(ids, vec!["b"]);

    assert!(longest_events(&[], UTC).is_empty());
}

#[test]
fn test_filter_by_substring() {
    let mut events = sample();
    events.push(event("5", "2024-01-07T09:00:00Z", "2024-01-07T10:00:00Z"));

    assert_eq!(filter_by_substring(&events, "").len(), events.len());

    let matched = filter_by_substring(&events, "TEAM");
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, "4");

    // Untitled events only survive an empty query
    assert!(filter_by_substring(&events, "o")
        .iter()
        .all(|e| e.summary.is_some()));
}

#[test]
fn test_dominant_color_needs_strictly_more_hours() {
    let events = vec![
        event("a", "2024-01-05T09:00:00Z", "2024-01-05T10:00:00Z").with_color("3"),
        event("b", "2024-01-05T11:00:00Z", "2024-01-05T12:00:00Z").with_color("4"),
    ];
    let days = date_breakdown(&events, UTC);
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].dominant_color, "3");
    assert_eq!(days[0].label, "Jan 5");
}

#[test]
fn test_summary_of_empty_list() {
    let summary = WrappedSummary::build(&[], UTC, None, None, "");
    assert_eq!(summary.total_events, 0);
    assert_eq!(summary.total_hours, 0.0);
    assert!(summary.chart.is_empty());
    assert!(summary.longest_events.is_empty());
    assert!(summary.days.is_empty());
}
