use calendar_wrapped::components::event_store::DateRange;
use calendar_wrapped::components::google_calendar::{
    CalendarApi, GoogleCalendarClient, TokenData, TokenManager, TokenStatus,
};
use calendar_wrapped::config::Config;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    Config {
        google_client_id: "client-id".to_string(),
        google_client_secret: "client-secret".to_string(),
        google_redirect_uri: "http://localhost:3000/api/auth/google/callback".to_string(),
        session_secret: "test-secret".to_string(),
        redis_url: None,
        bind_address: "127.0.0.1".to_string(),
        port: 3000,
        timezone: "UTC".to_string(),
        secure_cookies: false,
    }
}

fn token_manager(server: &MockServer) -> TokenManager {
    TokenManager::new(&test_config()).with_endpoints(
        "https://accounts.example.com/o/oauth2/v2/auth",
        &format!("{}/token", server.uri()),
    )
}

#[tokio::test]
async fn test_list_calendars_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "work@example.com"}]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "primary", "summary": "Me"}],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_api_base(&server.uri()).unwrap();
    let calendars = client.list_calendars("access-1").await.unwrap();

    assert_eq!(calendars.len(), 2);
    assert_eq!(calendars[0].summary, "Me");
    // Untitled calendars fall back to their id
    assert_eq!(calendars[1].summary, "work@example.com");
}

#[tokio::test]
async fn test_list_events_validates_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("timeMin", "2024-01-01T00:00:00Z"))
        .and(query_param("timeMax", "2024-02-01T00:00:00Z"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "evt1",
                    "summary": "Planning",
                    "colorId": "1",
                    "start": {"dateTime": "2024-01-05T09:00:00Z"},
                    "end": {"dateTime": "2024-01-05T10:00:00Z"}
                },
                {
                    "id": "evt2",
                    "summary": "Holiday",
                    "start": {"date": "2024-01-10"},
                    "end": {"date": "2024-01-11"}
                },
                {"id": "evt3", "status": "cancelled"},
                {"id": "evt4", "start": {"dateTime": "2024-01-05T09:00:00Z"}}
            ]
        })))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_api_base(&server.uri()).unwrap();
    let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
    let events = client
        .list_events("access-1", "primary", &range, chrono_tz::UTC)
        .await
        .unwrap();

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt1", "evt2"]);
    assert!(events[1].is_all_day());
    assert_eq!(events[0].color_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_api_base(&server.uri()).unwrap();
    let err = client.list_calendars("stale").await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_exchange_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let token = token_manager(&server).exchange_code("auth-code").await.unwrap();
    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert!(!token.is_expired());
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&server)
        .await;

    let err = token_manager(&server)
        .exchange_code("used-code")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid_grant"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = token_manager(&server);
    let expired = TokenData::new("access-1", Some("refresh-1".to_string()), -60);

    match manager.valid_token(Some(expired)).await {
        TokenStatus::Refreshed(token) => {
            assert_eq!(token.access_token, "access-2");
            // Google did not rotate it, so the old refresh token is kept
            assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
        }
        other => panic!("expected a refreshed token, got {:?}", other),
    }
}

#[tokio::test]
async fn test_token_status_without_network() {
    let server = MockServer::start().await;
    let manager = token_manager(&server);

    assert_eq!(manager.valid_token(None).await, TokenStatus::Missing);

    let fresh = TokenData::new("access-1", None, 3600);
    assert_eq!(
        manager.valid_token(Some(fresh.clone())).await,
        TokenStatus::Valid(fresh)
    );

    let expired = TokenData::new("access-1", None, -60);
    assert_eq!(manager.valid_token(Some(expired)).await, TokenStatus::Expired);
}

#[test]
fn test_authorization_url() {
    let manager = TokenManager::new(&test_config());
    let url = url::Url::parse(&manager.authorization_url("xyz").unwrap()).unwrap();
    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

    assert_eq!(url.host_str(), Some("accounts.google.com"));
    assert_eq!(params["client_id"], "client-id");
    assert_eq!(params["access_type"], "offline");
    assert_eq!(params["state"], "xyz");
    assert_eq!(
        params["scope"],
        "https://www.googleapis.com/auth/calendar.readonly"
    );
}
