use super::AppState;
use crate::error::{Error, WrappedResult};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Cookie carrying the signed session id
pub const SESSION_COOKIE: &str = "wrapped_session";

/// Session lifetime in days
pub const SESSION_DAYS: i64 = 30;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (session ID)
    pub sub: String,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at (as UTC timestamp)
    pub iat: usize,
}

/// The browser session a request belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
}

/// Signs and verifies session tokens
pub struct SessionService {
    secret: String,
}

impl SessionService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// Start a new session with a random id
    pub fn issue(&self) -> WrappedResult<(Session, String)> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
        };
        let token = self.generate_token(&session.id)?;
        Ok((session, token))
    }

    /// Generate a new JWT for a session id
    pub fn generate_token(&self, session_id: &str) -> WrappedResult<String> {
        let now = Utc::now();
        let exp = now + Duration::days(SESSION_DAYS);

        let claims = Claims {
            sub: session_id.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(signing_error)
    }

    /// Validate a JWT and recover its session
    pub fn validate_token(&self, token: &str) -> WrappedResult<Session> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|token_data| Session {
            id: token_data.claims.sub,
        })
        .map_err(|e| Error::Session(format!("Invalid session token: {}", e)))
    }
}

/// Failing to sign is a server fault, unlike a bad token from the client
fn signing_error(e: jsonwebtoken::errors::Error) -> Error {
    Error::Other(format!("Failed to generate session token: {}", e))
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

/// Attach a [`Session`] to every request, issuing a new one when the cookie
/// is missing or invalid
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = jar.get(SESSION_COOKIE).and_then(|cookie| {
        state
            .sessions
            .validate_token(cookie.value())
            .map_err(|e| debug!("Discarding session cookie: {}", e))
            .ok()
    });

    let (session, new_token) = match existing {
        Some(session) => (session, None),
        None => match state.sessions.issue() {
            Ok((session, token)) => (session, Some(token)),
            Err(e) => {
                error!("Failed to start session: {}", e);
                return e.into_response();
            }
        },
    };

    req.extensions_mut().insert(session);
    let response = next.run(req).await;

    match new_token {
        Some(token) => (
            CookieJar::new().add(session_cookie(token, state.secure_cookies)),
            response,
        )
            .into_response(),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_round_trip() {
        let service = SessionService::new("secret");
        let (session, token) = service.issue().unwrap();
        assert_eq!(service.validate_token(&token).unwrap(), session);
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let ours = SessionService::new("secret");
        let theirs = SessionService::new("other");
        let (_, token) = theirs.issue().unwrap();
        assert!(matches!(ours.validate_token(&token), Err(Error::Session(_))));
        assert!(ours.validate_token("garbage").is_err());
    }

    #[test]
    fn test_signing_failure_is_a_server_error() {
        use crate::web::ApiError;
        use axum::http::StatusCode;
        use jsonwebtoken::errors::ErrorKind;

        let err = signing_error(ErrorKind::InvalidKeyFormat.into());
        assert!(!matches!(err, Error::Session(_)));
        assert_eq!(ApiError::from(err).status, StatusCode::INTERNAL_SERVER_ERROR);

        let rejected = SessionService::new("secret").validate_token("garbage").unwrap_err();
        assert_eq!(ApiError::from(rejected).status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_distinct_sessions() {
        let service = SessionService::new("secret");
        let (a, _) = service.issue().unwrap();
        let (b, _) = service.issue().unwrap();
        assert_ne!(a.id, b.id);
    }
}
