use super::cookies::{self, current_token, AUTH_COOKIE, STATE_COOKIE};
use super::{ApiError, AppState, FetchRequest, Session};
use crate::components::event_store::{DateRange, Event};
use crate::components::google_calendar::TokenData;
use crate::components::wrapped::WrappedSummary;
use crate::error::validation_error;
use axum::{
    extract::{rejection::JsonRejection, Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Token lifetime assumed for tokens handed in through store-token
const STORED_TOKEN_SECONDS: i64 = 3600;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRequest {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StoreTokenRequest {
    #[serde(alias = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsRequest {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedDataRequest {
    #[serde(default)]
    pub events: Option<Vec<Event>>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub default_color_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

impl SearchParams {
    pub fn query(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Length of the random OAuth `state` value
const OAUTH_STATE_LEN: usize = 32;

fn new_oauth_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(OAUTH_STATE_LEN)
        .map(char::from)
        .collect()
}

/// Prefer the token in the body, otherwise the cookie's
async fn resolve_token(
    state: &AppState,
    jar: CookieJar,
    from_body: Option<String>,
) -> (CookieJar, Option<String>) {
    match from_body.filter(|t| !t.trim().is_empty()) {
        Some(token) => (jar, Some(token)),
        None => current_token(state, jar).await,
    }
}

/// GET /api/auth/google
pub async fn auth_url_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let oauth_state = new_oauth_state();
    let url = state
        .tokens
        .authorization_url(&oauth_state)
        .map_err(|e| ApiError::upstream("Failed to generate auth URL", e))?;

    let jar = jar.add(cookies::state_cookie(&oauth_state, state.secure_cookies));
    Ok((jar, Json(json!({ "url": url }))))
}

/// GET /auth/login
pub async fn login_redirect_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let oauth_state = new_oauth_state();
    let url = state
        .tokens
        .authorization_url(&oauth_state)
        .map_err(|e| ApiError::upstream("Failed to generate auth URL", e))?;

    let jar = jar.add(cookies::state_cookie(&oauth_state, state.secure_cookies));
    Ok((jar, Redirect::to(&url)))
}

/// GET /api/auth/google/callback
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(reason) = params.error {
        warn!("Google sign-in was not completed: {}", reason);
        return (
            jar.remove(cookies::removal(STATE_COOKIE)),
            Redirect::to("/?error=signin_cancelled"),
        )
            .into_response();
    }

    let Some(code) = params.code else {
        return ApiError::new(StatusCode::BAD_REQUEST, "No code provided").into_response();
    };

    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != params.state {
        warn!("OAuth callback state did not match");
        return ApiError::new(StatusCode::BAD_REQUEST, "Invalid OAuth state").into_response();
    }

    let jar = jar.remove(cookies::removal(STATE_COOKIE));
    let token = match state.tokens.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Failed to get tokens: {}", e);
            return (jar, Redirect::to("/?error=signin_failed")).into_response();
        }
    };

    match cookies::auth_cookie(&token, state.secure_cookies) {
        Ok(cookie) => {
            info!("Google sign-in completed");
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(e) => ApiError::upstream("Failed to get tokens", e).into_response(),
    }
}

/// GET /api/auth/check-token
pub async fn check_token_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let (jar, access_token) = current_token(&state, jar).await;
    (jar, Json(json!({ "accessToken": access_token })))
}

/// POST /api/auth/store-token
pub async fn store_token_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<StoreTokenRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    if request.access_token.trim().is_empty() {
        return Err(validation_error("No access token provided").into());
    }

    let token = TokenData::new(&request.access_token, None, STORED_TOKEN_SECONDS);
    let cookie = cookies::stored_token_cookie(&token, state.secure_cookies)
        .map_err(|e| ApiError::upstream("Failed to store token", e))?;

    Ok((jar.add(cookie), Json(json!({ "success": true }))))
}

/// POST /api/auth/logout
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let mut store = state.event_store(&session).await;
    if let Err(e) = store.set_data_loaded(false).await {
        error!("Failed to clear data for session {}: {}", session.id, e);
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to logout",
        ));
    }
    info!("Signed out session {}", session.id);

    Ok((
        jar.remove(cookies::removal(AUTH_COOKIE)),
        Json(json!({ "success": true })),
    ))
}

/// POST /api/calendar/calendars
pub async fn calendars_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<AccessTokenRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let (jar, access_token) = resolve_token(&state, jar, request.access_token).await;
    let Some(access_token) = access_token else {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Not authenticated"));
    };

    let calendars = state
        .calendar
        .list_calendars(&access_token)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch calendars", e))?;

    Ok((jar, Json(json!({ "calendars": calendars }))))
}

/// POST /api/calendar/events
pub async fn events_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<EventsRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let (jar, access_token) = resolve_token(&state, jar, request.access_token).await;
    let fetch = FetchRequest::validate(
        access_token.as_deref(),
        request.calendar_id.as_deref(),
        request.start_date.as_deref(),
        request.end_date.as_deref(),
    )?;

    let events = state
        .calendar
        .list_events(
            &fetch.access_token,
            &fetch.calendar_id,
            &fetch.date_range,
            state.tz,
        )
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch events", e))?;

    Ok((jar, Json(json!({ "events": events }))))
}

/// GET /api/wrapped
pub async fn wrapped_summary_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<SearchParams>,
) -> Result<Json<WrappedSummary>, ApiError> {
    let store = state.event_store(&session).await;
    if store.events().is_empty() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "No wrapped data"));
    }

    Ok(Json(WrappedSummary::build(
        store.events(),
        state.tz,
        store.date_range(),
        store.default_color_id(),
        params.query(),
    )))
}

/// POST /api/wrapped
pub async fn set_wrapped_data_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<WrappedDataRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected wrapped data: {}", rejection.body_text());
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid wrapped data provided")
    })?;
    let (Some(events), Some(date_range)) = (request.events, request.date_range) else {
        return Err(validation_error("Invalid wrapped data provided").into());
    };
    for event in &events {
        event.validate(state.tz)?;
    }
    // Re-check the range; deserialization does not enforce its ordering
    let date_range = DateRange::new(date_range.start_date, date_range.end_date)?;

    let count = events.len();
    let mut store = state.event_store(&session).await;
    store
        .replace_data(events, date_range, request.default_color_id.as_deref())
        .await;
    info!("Stored {} events for session {}", count, session.id);

    Ok(Json(json!({ "success": true, "events": count })))
}

/// GET /health
pub async fn health_handler() -> &'static str {
    "OK"
}
