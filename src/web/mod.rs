//! HTTP surface: OAuth routes, the calendar proxy, the intake form and the
//! dashboard

pub mod api;
pub mod cookies;
pub mod handlers;
pub mod session;
pub mod views;

use crate::components::event_store::{DateRange, EventStore, StateStorage};
use crate::components::google_calendar::{CalendarApi, TokenManager};
use crate::config::Config;
use crate::error::{oauth_error, validation_error, Error, WrappedResult};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono_tz::Tz;
use serde_json::json;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::error;

pub use session::{Session, SessionService};

/// Directory served under `/assets`
pub const ASSETS_DIR: &str = "assets";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub tz: Tz,
    pub secure_cookies: bool,
    pub tokens: Arc<TokenManager>,
    pub calendar: Arc<dyn CalendarApi>,
    pub storage: Arc<dyn StateStorage>,
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn new(
        config: &Config,
        calendar: Arc<dyn CalendarApi>,
        storage: Arc<dyn StateStorage>,
    ) -> WrappedResult<Self> {
        Ok(Self {
            tz: config.tz()?,
            secure_cookies: config.secure_cookies,
            tokens: Arc::new(TokenManager::new(config)),
            calendar,
            storage,
            sessions: Arc::new(SessionService::new(&config.session_secret)),
        })
    }

    /// Load the event store belonging to `session`
    pub async fn event_store(&self, session: &Session) -> EventStore {
        EventStore::open(&session.id, self.storage.clone()).await
    }
}

/// JSON error body `{"error": message}` with a status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    /// Log the underlying failure and answer with a generic message
    pub fn upstream(message: &str, err: Error) -> Self {
        error!("{}: {}", message, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => Self::new(StatusCode::BAD_REQUEST, &message),
            Error::OAuth(message) | Error::Session(message) => {
                Self::new(StatusCode::UNAUTHORIZED, &message)
            }
            other => Self::upstream("Internal server error", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// A validated request to fetch one calendar's events
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub access_token: String,
    pub calendar_id: String,
    pub date_range: DateRange,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl FetchRequest {
    /// Check the intake fields in the order the form reports them
    pub fn validate(
        access_token: Option<&str>,
        calendar_id: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> WrappedResult<Self> {
        let access_token =
            present(access_token).ok_or_else(|| oauth_error("Please sign in with Google first"))?;
        let calendar_id =
            present(calendar_id).ok_or_else(|| validation_error("Please select a calendar"))?;
        let date_range = DateRange::parse(
            start_date.unwrap_or_default(),
            end_date.unwrap_or_default(),
        )?;

        Ok(Self {
            access_token: access_token.to_string(),
            calendar_id: calendar_id.to_string(),
            date_range,
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route(
            "/wrapped",
            get(handlers::wrapped_handler).post(handlers::generate_handler),
        )
        .route("/logout", post(handlers::logout_handler))
        .route("/auth/login", get(api::login_redirect_handler))
        .route("/api/auth/google", get(api::auth_url_handler))
        .route("/api/auth/google/callback", get(api::oauth_callback_handler))
        .route("/api/auth/check-token", get(api::check_token_handler))
        .route("/api/auth/store-token", post(api::store_token_handler))
        .route("/api/auth/logout", post(api::logout_handler))
        .route("/api/calendar/calendars", post(api::calendars_handler))
        .route("/api/calendar/events", post(api::events_handler))
        .route(
            "/api/wrapped",
            get(api::wrapped_summary_handler).post(api::set_wrapped_data_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ))
        .route("/health", get(api::health_handler))
        .nest_service("/assets", ServeDir::new(ASSETS_DIR))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
