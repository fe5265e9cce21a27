use super::api::SearchParams;
use super::cookies::{self, current_token, AUTH_COOKIE};
use super::views::{error_message, render, HomeTemplate, WrappedTemplate};
use super::{AppState, FetchRequest, Session};
use crate::components::google_calendar::CalendarSummary;
use crate::components::wrapped::{palette, WrappedSummary};
use crate::error::{validation_error, Error, WrappedResult};
use axum::{
    extract::{Extension, Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    #[serde(default)]
    pub error: Option<String>,
}

/// Fields of the intake form
#[derive(Debug, Default, Deserialize)]
pub struct WrappedForm {
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub default_color_id: Option<String>,
}

impl WrappedForm {
    /// The chosen fallback color, which must be a palette id
    fn default_color(&self) -> WrappedResult<&'static str> {
        self.default_color_id
            .as_deref()
            .and_then(palette::find)
            .map(|color| color.id)
            .ok_or_else(|| validation_error("Please select a default color"))
    }
}

async fn fetch_calendars(state: &AppState, access_token: &str) -> Option<Vec<CalendarSummary>> {
    match state.calendar.list_calendars(access_token).await {
        Ok(calendars) => Some(calendars),
        Err(e) => {
            error!("Failed to fetch calendars: {}", e);
            None
        }
    }
}

fn page(status: StatusCode, template: HomeTemplate) -> Response {
    match render(&template) {
        Ok(html) => (status, html).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /
pub async fn index_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Query(params): Query<IndexParams>,
) -> Response {
    let notice = error_message(params.error.as_deref());
    let (jar, access_token) = current_token(&state, jar).await;

    let Some(access_token) = access_token else {
        return (jar, page(StatusCode::OK, HomeTemplate::signed_out(notice))).into_response();
    };

    let store = state.event_store(&session).await;
    let (calendars, notice) = match fetch_calendars(&state, &access_token).await {
        Some(calendars) => (calendars, notice),
        None => (Vec::new(), Some("Failed to fetch calendars".to_string())),
    };

    let home = HomeTemplate::intake(
        &calendars,
        None,
        store.date_range(),
        store.default_color_id(),
    )
    .with_error(notice)
    .with_data(store.is_data_loaded());

    (jar, page(StatusCode::OK, home)).into_response()
}

/// POST /wrapped: validate the form, fetch the events and store them
pub async fn generate_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Form(form): Form<WrappedForm>,
) -> Response {
    let (jar, access_token) = current_token(&state, jar).await;

    let validated = FetchRequest::validate(
        access_token.as_deref(),
        form.calendar_id.as_deref(),
        form.start_date.as_deref(),
        form.end_date.as_deref(),
    )
    .and_then(|request| form.default_color().map(|color| (request, color)));

    let (request, default_color) = match validated {
        Ok(validated) => validated,
        Err(Error::OAuth(message)) => {
            let home = HomeTemplate::signed_out(Some(message));
            return (jar, page(StatusCode::UNAUTHORIZED, home)).into_response();
        }
        Err(e) => {
            let calendars = match access_token.as_deref() {
                Some(token) => fetch_calendars(&state, token).await.unwrap_or_default(),
                None => Vec::new(),
            };
            let home = HomeTemplate::intake(
                &calendars,
                form.calendar_id.as_deref(),
                None,
                form.default_color_id.as_deref(),
            )
            .with_error(Some(e.to_string()));
            let home = HomeTemplate {
                start_date: form.start_date.clone().unwrap_or_default(),
                end_date: form.end_date.clone().unwrap_or_default(),
                ..home
            };
            return (jar, page(StatusCode::BAD_REQUEST, home)).into_response();
        }
    };

    let events = match state
        .calendar
        .list_events(
            &request.access_token,
            &request.calendar_id,
            &request.date_range,
            state.tz,
        )
        .await
    {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to fetch events: {}", e);
            let calendars = fetch_calendars(&state, &request.access_token)
                .await
                .unwrap_or_default();
            let home = HomeTemplate::intake(
                &calendars,
                Some(&request.calendar_id),
                Some(request.date_range),
                Some(default_color),
            )
            .with_error(Some("Failed to fetch events".to_string()));
            return (jar, page(StatusCode::BAD_GATEWAY, home)).into_response();
        }
    };

    info!(
        "Loaded {} events from {} for session {}",
        events.len(),
        request.calendar_id,
        session.id
    );

    let mut store = state.event_store(&session).await;
    store
        .replace_data(events, request.date_range, Some(default_color))
        .await;

    (jar, Redirect::to("/wrapped")).into_response()
}

/// GET /wrapped
pub async fn wrapped_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<SearchParams>,
) -> Response {
    let store = state.event_store(&session).await;
    if store.events().is_empty() {
        return Redirect::to("/").into_response();
    }

    let summary = WrappedSummary::build(
        store.events(),
        state.tz,
        store.date_range(),
        store.default_color_id(),
        params.query(),
    );

    match WrappedTemplate::from_summary(&summary, state.tz).and_then(|view| render(&view)) {
        Ok(html) => html.into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /logout: forget the session's data and the Google tokens
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let mut store = state.event_store(&session).await;
    if let Err(e) = store.set_data_loaded(false).await {
        // Keep the tokens so signing out can be retried
        error!("Failed to clear data for session {}: {}", session.id, e);
        return (jar, Redirect::to("/?error=signout_failed"));
    }
    info!("Signed out session {}", session.id);

    (jar.remove(cookies::removal(AUTH_COOKIE)), Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_color_must_be_known() {
        let form = WrappedForm {
            default_color_id: Some("7".to_string()),
            ..Default::default()
        };
        assert_eq!(form.default_color().unwrap(), "7");

        let form = WrappedForm {
            default_color_id: Some("42".to_string()),
            ..Default::default()
        };
        assert_eq!(
            form.default_color().unwrap_err().to_string(),
            "Please select a default color"
        );
        assert!(WrappedForm::default().default_color().is_err());
    }
}
