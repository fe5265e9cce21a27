use crate::components::event_store::{DateRange, Event};
use crate::components::google_calendar::CalendarSummary;
use crate::components::wrapped::palette::{self, PALETTE};
use crate::components::wrapped::WrappedSummary;
use crate::error::WrappedResult;
use crate::utils::time::{day_label, format_hours, format_span};
use askama::Template;
use axum::response::Html;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;

/// Error codes the home page is allowed to show, with their messages
const ALLOWED_ERRORS: [(&str, &str); 3] = [
    ("signin_cancelled", "Google sign-in was cancelled"),
    ("signin_failed", "Google sign-in failed, please try again"),
    ("signout_failed", "Signing out failed, please try again"),
];

/// Message for an `?error=` code, ignoring anything unknown
pub fn error_message(code: Option<&str>) -> Option<String> {
    let code = code?;
    ALLOWED_ERRORS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| message.to_string())
}

/// JSON that is safe to place inside a `<script>` element
pub fn script_json<T: Serialize>(value: &T) -> WrappedResult<String> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Render any template into an HTML response body
pub fn render<T: Template>(template: &T) -> WrappedResult<Html<String>> {
    Ok(Html(template.render()?))
}

pub struct CalendarOption {
    pub id: String,
    pub summary: String,
    pub selected: bool,
}

pub struct ColorOption {
    pub id: String,
    pub name: String,
    pub hex: String,
    pub selected: bool,
}

/// Sign-in page, or the intake form once signed in
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
    pub calendars: Vec<CalendarOption>,
    pub colors: Vec<ColorOption>,
    pub start_date: String,
    pub end_date: String,
    pub error: Option<String>,
    pub has_data: bool,
}

impl HomeTemplate {
    pub fn signed_out(error: Option<String>) -> Self {
        Self {
            signed_in: false,
            calendars: Vec::new(),
            colors: Vec::new(),
            start_date: String::new(),
            end_date: String::new(),
            error,
            has_data: false,
        }
    }

    /// The intake form with previous choices preselected
    pub fn intake(
        calendars: &[CalendarSummary],
        selected_calendar: Option<&str>,
        date_range: Option<DateRange>,
        default_color_id: Option<&str>,
    ) -> Self {
        let calendars = calendars
            .iter()
            .map(|calendar| CalendarOption {
                id: calendar.id.clone(),
                summary: calendar.summary.clone(),
                selected: selected_calendar == Some(calendar.id.as_str()),
            })
            .collect();

        let colors = PALETTE
            .iter()
            .map(|color| ColorOption {
                id: color.id.to_string(),
                name: color.name.to_string(),
                hex: color.hex_color.to_string(),
                selected: default_color_id == Some(color.id),
            })
            .collect();

        let (start_date, end_date) = match date_range {
            Some(range) => (range.start_date.to_string(), range.end_date.to_string()),
            None => (String::new(), String::new()),
        };

        Self {
            signed_in: true,
            calendars,
            colors,
            start_date,
            end_date,
            error: None,
            has_data: false,
        }
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn with_data(mut self, has_data: bool) -> Self {
        self.has_data = has_data;
        self
    }
}

pub struct ColorRow {
    pub name: String,
    pub hex: String,
    pub hours: String,
    pub count: usize,
    pub share: String,
}

pub struct DayRow {
    pub label: String,
    pub count: usize,
    pub hours: String,
    pub gap: String,
    pub dominant_name: String,
    pub dominant_hex: String,
}

pub struct EventRow {
    pub summary: String,
    pub when: String,
    pub duration: String,
    pub description: String,
    pub hex: String,
}

/// The dashboard
#[derive(Template)]
#[template(path = "wrapped.html")]
pub struct WrappedTemplate {
    pub range_label: String,
    pub total_events: usize,
    pub total_hours: String,
    pub gap_hours: String,
    pub chart_json: String,
    pub colors: Vec<ColorRow>,
    pub days: Vec<DayRow>,
    pub longest: Vec<EventRow>,
    pub timeline: Vec<EventRow>,
    pub query: String,
}

fn event_row(event: &Event, duration: f64, default_hex: &str, tz: Tz) -> EventRow {
    let key = event.color_key();
    EventRow {
        summary: event
            .summary
            .clone()
            .unwrap_or_else(|| "(No title)".to_string()),
        when: format_span(
            &event.start.instant(tz),
            &event.end.instant(tz),
            event.is_all_day(),
        ),
        duration: format_hours(duration),
        description: event.description.clone().unwrap_or_default(),
        hex: if key == palette::DEFAULT_COLOR_KEY {
            default_hex.to_string()
        } else {
            palette::hex_for(key).to_string()
        },
    }
}

impl WrappedTemplate {
    pub fn from_summary(summary: &WrappedSummary, tz: Tz) -> WrappedResult<Self> {
        let default_hex = summary
            .default_color_id
            .as_deref()
            .and_then(palette::find)
            .map(|c| c.hex_color)
            .unwrap_or(palette::DEFAULT_HEX);

        let colors = summary
            .chart
            .keys
            .iter()
            .zip(summary.chart.values.iter())
            .zip(summary.chart.colors.iter())
            .map(|((key, hours), hex)| ColorRow {
                name: palette::name_for(key).to_string(),
                hex: hex.clone(),
                hours: format_hours(*hours),
                count: summary.event_counts.get(key).copied().unwrap_or(0),
                share: if summary.total_hours > 0.0 {
                    format!("{:.0}%", hours / summary.total_hours * 100.0)
                } else {
                    "0%".to_string()
                },
            })
            .collect();

        let mut gaps_by_label: HashMap<String, f64> = HashMap::new();
        for (date, gap) in &summary.gap_hours_by_day {
            *gaps_by_label.entry(day_label(*date)).or_insert(0.0) += gap;
        }

        let days = summary
            .days
            .iter()
            .map(|day| DayRow {
                label: day.label.clone(),
                count: day.count,
                hours: format_hours(day.hours),
                gap: format_hours(gaps_by_label.get(&day.label).copied().unwrap_or(0.0)),
                dominant_name: palette::name_for(&day.dominant_color).to_string(),
                dominant_hex: if day.dominant_color == palette::DEFAULT_COLOR_KEY {
                    default_hex.to_string()
                } else {
                    palette::hex_for(&day.dominant_color).to_string()
                },
            })
            .collect();

        let longest = summary
            .longest_events
            .iter()
            .map(|longest| event_row(&longest.event, longest.duration, default_hex, tz))
            .collect();

        let timeline = summary
            .timeline
            .iter()
            .map(|event| {
                let hours = crate::components::wrapped::stats::event_hours(event, tz);
                event_row(event, hours, default_hex, tz)
            })
            .collect();

        let range_label = match summary.date_range {
            Some(range) => format!(
                "{} - {}",
                range.start_date.format("%b %-d, %Y"),
                range.end_date.format("%b %-d, %Y")
            ),
            None => String::new(),
        };

        Ok(Self {
            range_label,
            total_events: summary.total_events,
            total_hours: format_hours(summary.total_hours),
            gap_hours: format_hours(summary.gap_hours),
            // Palette-resolved values only; raw color ids stay out of the page
            chart_json: script_json(&serde_json::json!({
                "labels": summary.chart.labels,
                "values": summary.chart.values,
                "colors": summary.chart.colors,
            }))?,
            colors,
            days,
            longest,
            timeline,
            query: summary.query.clone(),
        })
    }
}
