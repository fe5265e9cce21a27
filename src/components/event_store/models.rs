use crate::components::wrapped::palette::{is_event_color, DEFAULT_COLOR_KEY};
use crate::error::{validation_error, WrappedResult};
use crate::utils::time::{local_midnight, parse_date};
use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Start or end of an event: a precise timestamp or an all-day date.
///
/// Serialized the way the calendar API sends it, with exactly one of
/// `dateTime` or `date`. All-day dates only become instants once a zone is
/// known, see [`EventTime::instant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Timed {
        #[serde(rename = "dateTime")]
        date_time: DateTime<FixedOffset>,
    },
    AllDay {
        date: NaiveDate,
    },
}

impl EventTime {
    /// A precise timestamp
    pub fn at(date_time: DateTime<FixedOffset>) -> Self {
        Self::Timed { date_time }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self::AllDay { date }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }

    /// The instant this time stands for. All-day dates start at local
    /// midnight in `tz`.
    pub fn instant(&self, tz: Tz) -> DateTime<FixedOffset> {
        match self {
            Self::Timed { date_time } => *date_time,
            Self::AllDay { date } => local_midnight(*date, tz),
        }
    }

    /// Calendar date of this time: the timestamp's own date, or the all-day date
    pub fn local_date(&self) -> NaiveDate {
        match self {
            Self::Timed { date_time } => date_time.date_naive(),
            Self::AllDay { date } => *date,
        }
    }
}

/// One calendar occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl Event {
    /// Create a timed event without summary, description or color
    pub fn new(id: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self {
            id: id.to_string(),
            summary: None,
            start: EventTime::at(start),
            end: EventTime::at(end),
            description: None,
            color_id: None,
        }
    }

    /// Create an all-day event covering `start` up to (excluding) `end`
    pub fn all_day(id: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            summary: None,
            start: EventTime::all_day(start),
            end: EventTime::all_day(end),
            description: None,
            color_id: None,
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn with_color(mut self, color_id: &str) -> Self {
        self.color_id = Some(color_id.to_string());
        self
    }

    /// Color category: the explicit color id, or "default"
    pub fn color_key(&self) -> &str {
        self.color_id.as_deref().unwrap_or(DEFAULT_COLOR_KEY)
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Check the record invariants: a non-empty id, a known color and
    /// `end >= start` with all-day dates resolved in `tz`
    pub fn validate(&self, tz: Tz) -> WrappedResult<()> {
        if self.id.trim().is_empty() {
            return Err(validation_error("Event is missing an id"));
        }
        if let Some(color_id) = self.color_id.as_deref() {
            if !is_event_color(color_id) {
                return Err(validation_error(&format!(
                    "Event {} has an unknown color: {}",
                    self.id, color_id
                )));
            }
        }
        if self.end.instant(tz) < self.start.instant(tz) {
            return Err(validation_error(&format!(
                "Event {} ends before it starts",
                self.id
            )));
        }
        Ok(())
    }
}

/// The queried window, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> WrappedResult<Self> {
        if end_date < start_date {
            return Err(validation_error("End date cannot be before start date"));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Parse form input in YYYY-MM-DD format
    pub fn parse(start_date: &str, end_date: &str) -> WrappedResult<Self> {
        if start_date.trim().is_empty() || end_date.trim().is_empty() {
            return Err(validation_error("Please select both a start and an end date"));
        }
        let start = parse_date(start_date)
            .ok_or_else(|| validation_error(&format!("Invalid start date: {}", start_date)))?;
        let end = parse_date(end_date)
            .ok_or_else(|| validation_error(&format!("Invalid end date: {}", end_date)))?;
        Self::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(value).unwrap()
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event::new("abc", ts("2024-01-05T09:00:00+02:00"), ts("2024-01-05T10:00:00+02:00"))
            .with_summary("Standup")
            .with_color("7");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["colorId"], "7");
        assert_eq!(json["start"]["dateTime"], "2024-01-05T09:00:00+02:00");
        assert!(json["start"].get("date").is_none());
        assert!(json.get("description").is_none());

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_all_day_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let time = EventTime::all_day(date);
        assert!(time.is_all_day());
        assert_eq!(time.local_date(), date);
        assert_eq!(time.instant(chrono_tz::UTC), ts("2024-03-01T00:00:00+00:00"));
        assert_eq!(
            time.instant(chrono_tz::Europe::Helsinki),
            ts("2024-03-01T00:00:00+02:00")
        );

        // Only one of the two fields is ever written
        let json = serde_json::to_value(&time).unwrap();
        assert_eq!(json, serde_json::json!({ "date": "2024-03-01" }));
    }

    #[test]
    fn test_all_day_event_json() {
        let json = serde_json::json!({
            "id": "holiday",
            "start": { "date": "2024-01-05" },
            "end": { "date": "2024-01-06" },
        });
        let event: Event = serde_json::from_value(json.clone()).unwrap();
        assert!(event.is_all_day());
        assert!(event.validate(chrono_tz::UTC).is_ok());
        assert_eq!(serde_json::to_value(&event).unwrap(), json);

        let missing: Result<Event, _> = serde_json::from_value(serde_json::json!({
            "id": "x",
            "start": {},
            "end": { "date": "2024-01-06" },
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_color_key_defaults() {
        let event = Event::new("a", ts("2024-01-05T09:00:00Z"), ts("2024-01-05T10:00:00Z"));
        assert_eq!(event.color_key(), "default");
        assert_eq!(event.with_color("3").color_key(), "3");
    }

    #[test]
    fn test_validate() {
        let tz = chrono_tz::UTC;
        let ok = Event::new("a", ts("2024-01-05T09:00:00Z"), ts("2024-01-05T09:00:00Z"));
        assert!(ok.validate(tz).is_ok());
        assert!(ok.clone().with_color("11").validate(tz).is_ok());

        let backwards = Event::new("b", ts("2024-01-05T10:00:00Z"), ts("2024-01-05T09:00:00Z"));
        assert!(backwards.validate(tz).is_err());

        let no_id = Event::new(" ", ts("2024-01-05T09:00:00Z"), ts("2024-01-05T10:00:00Z"));
        assert!(no_id.validate(tz).is_err());

        for color in ["0", "12", "default", "</script>"] {
            assert!(ok.clone().with_color(color).validate(tz).is_err());
        }

        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert!(Event::all_day("c", day(6), day(5)).validate(tz).is_err());
    }

    #[test]
    fn test_date_range_parse() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(range.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        // Same day is allowed
        assert!(DateRange::parse("2024-01-01", "2024-01-01").is_ok());

        assert!(DateRange::parse("2024-02-01", "2024-01-01").is_err());
        assert!(DateRange::parse("", "2024-01-01").is_err());
        assert!(DateRange::parse("2024-01-01", "tomorrow").is_err());

        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json["startDate"], "2024-01-01");
        assert_eq!(json["endDate"], "2024-01-31");
    }
}
