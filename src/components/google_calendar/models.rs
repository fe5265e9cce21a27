use crate::components::event_store::models::{Event, EventTime};
use crate::components::wrapped::palette::is_event_color;
use crate::utils::time::parse_date;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// An event item as returned by the Calendar API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub color_id: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
}

/// Start or end of an API event: `dateTime` for timed, `date` for all-day
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

/// Calendar list entry as exposed to the intake form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventsPage {
    pub items: Option<Vec<CalendarEvent>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CalendarListPage {
    pub items: Option<Vec<CalendarListItem>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarListItem {
    pub id: String,
    pub summary: Option<String>,
}

impl EventDateTime {
    fn resolve(&self, field: &str) -> Result<EventTime, String> {
        if let Some(value) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(value)
                .map(EventTime::at)
                .map_err(|e| format!("invalid {}.dateTime {:?}: {}", field, value, e));
        }
        if let Some(value) = self.date.as_deref() {
            return parse_date(value)
                .map(EventTime::all_day)
                .ok_or_else(|| format!("invalid {}.date {:?}", field, value));
        }
        Err(format!("{} has neither dateTime nor date", field))
    }
}

impl CalendarEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Validate an API item into an [`Event`]. All-day dates are ordered as
    /// midnight in `tz`; color ids outside the palette fold into "default".
    pub fn into_event(self, tz: Tz) -> Result<Event, String> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| "missing id".to_string())?;
        let start = self
            .start
            .as_ref()
            .ok_or_else(|| format!("event {} has no start", id))?
            .resolve("start")?;
        let end = self
            .end
            .as_ref()
            .ok_or_else(|| format!("event {} has no end", id))?
            .resolve("end")?;

        if end.instant(tz) < start.instant(tz) {
            return Err(format!("event {} ends before it starts", id));
        }

        Ok(Event {
            id,
            summary: self.summary,
            start,
            end,
            description: self.description,
            color_id: self.color_id.filter(|id| is_event_color(id)),
        })
    }
}
