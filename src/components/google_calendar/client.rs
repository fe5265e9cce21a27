use super::models::{CalendarListPage, CalendarSummary, EventsPage};
use crate::components::event_store::models::{DateRange, Event};
use crate::error::{google_calendar_error, WrappedResult};
use crate::utils::time::query_window;
use async_trait::async_trait;
use chrono::SecondsFormat;
use chrono_tz::Tz;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use url::Url;

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

/// Upper bound the API accepts for one events page
const MAX_RESULTS: &str = "2500";

/// Read access to a user's calendars
#[async_trait]
pub trait CalendarApi: Send + Sync + 'static {
    /// Calendars visible to the token owner
    async fn list_calendars(&self, access_token: &str) -> WrappedResult<Vec<CalendarSummary>>;

    /// Validated events of `calendar_id` within the inclusive date range
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        range: &DateRange,
        tz: Tz,
    ) -> WrappedResult<Vec<Event>>;
}

/// Calendar API v3 over reqwest
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    api_base: Url,
}

impl GoogleCalendarClient {
    pub fn new() -> WrappedResult<Self> {
        Self::with_api_base(CALENDAR_API_BASE)
    }

    /// Use another API root, for tests against a mock server
    pub fn with_api_base(api_base: &str) -> WrappedResult<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        Ok(Self {
            client: Client::new(),
            api_base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> WrappedResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, access_token: &str) -> WrappedResult<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_calendars(&self, access_token: &str) -> WrappedResult<Vec<CalendarSummary>> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["users", "me", "calendarList"])?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page: CalendarListPage = self.get_json(url, access_token).await?;
            calendars.extend(page.items.unwrap_or_default().into_iter().map(|item| {
                CalendarSummary {
                    summary: item.summary.unwrap_or_else(|| item.id.clone()),
                    id: item.id,
                }
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        range: &DateRange,
        tz: Tz,
    ) -> WrappedResult<Vec<Event>> {
        let (time_min, time_max) = query_window(range.start_date, range.end_date, tz);
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = time_max.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut events = Vec::new();
        let mut rejected = 0usize;
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["calendars", calendar_id, "events"])?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &time_min)
                    .append_pair("timeMax", &time_max)
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime")
                    .append_pair("timeZone", tz.name())
                    .append_pair("maxResults", MAX_RESULTS);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: EventsPage = self.get_json(url, access_token).await?;
            for item in page.items.unwrap_or_default() {
                if item.is_cancelled() {
                    continue;
                }
                match item.into_event(tz) {
                    Ok(event) => events.push(event),
                    Err(reason) => {
                        rejected += 1;
                        warn!("Skipping malformed event: {}", reason);
                    }
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            "Fetched {} events from {} ({} rejected)",
            events.len(),
            calendar_id,
            rejected
        );
        Ok(events)
    }
}
