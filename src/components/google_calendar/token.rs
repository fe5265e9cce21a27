use crate::config::Config;
use crate::error::{oauth_error, WrappedResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Token lifetime assumed when the endpoint does not say
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// OAuth tokens as kept in the auth cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch milliseconds
    pub expiry_date: i64,
}

impl TokenData {
    /// A token expiring `expires_in` seconds from now
    pub fn new(access_token: &str, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token,
            expiry_date: Utc::now().timestamp_millis() + expires_in * 1000,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() >= self.expiry_date
    }

    /// Cookie-safe encoding: base64url of the JSON
    pub fn encode(&self) -> WrappedResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(value: &str) -> WrappedResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| oauth_error(&format!("Malformed token cookie: {}", e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Outcome of looking for a usable access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No stored token
    Missing,
    /// Stored token is still valid
    Valid(TokenData),
    /// Stored token had expired and was refreshed; store the new one
    Refreshed(TokenData),
    /// Expired and could not be refreshed
    Expired,
}

impl TokenStatus {
    pub fn access_token(&self) -> Option<&str> {
        match self {
            TokenStatus::Valid(token) | TokenStatus::Refreshed(token) => {
                Some(token.access_token.as_str())
            }
            TokenStatus::Missing | TokenStatus::Expired => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponsePayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Talks to Google's OAuth endpoints
#[derive(Clone)]
pub struct TokenManager {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorization_endpoint: String,
    token_endpoint: String,
}

impl TokenManager {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            authorization_endpoint: AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    /// Point at other endpoints, for tests against a mock server
    pub fn with_endpoints(mut self, authorization_endpoint: &str, token_endpoint: &str) -> Self {
        self.authorization_endpoint = authorization_endpoint.to_string();
        self.token_endpoint = token_endpoint.to_string();
        self
    }

    /// Consent URL asking for offline, read-only calendar access
    pub fn authorization_url(&self, state: &str) -> WrappedResult<String> {
        let mut url = Url::parse(&self.authorization_endpoint)
            .map_err(|e| oauth_error(&format!("Invalid authorization endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("scope", CALENDAR_SCOPE)
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> WrappedResult<TokenData> {
        let payload = self
            .post_form(&[
                ("grant_type", "authorization_code".to_string()),
                ("client_id", self.client_id.clone()),
                ("client_secret", self.client_secret.clone()),
                ("redirect_uri", self.redirect_uri.clone()),
                ("code", code.to_string()),
            ])
            .await?;

        let access_token = payload
            .access_token
            .ok_or_else(|| oauth_error("Token response missing 'access_token' field"))?;
        info!("Exchanged authorization code for tokens");

        Ok(TokenData::new(
            &access_token,
            payload.refresh_token,
            payload.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        ))
    }

    /// Refresh an expired token, keeping the refresh token when Google does
    /// not rotate it
    pub async fn refresh_token(&self, refresh_token: &str) -> WrappedResult<TokenData> {
        let payload = self
            .post_form(&[
                ("grant_type", "refresh_token".to_string()),
                ("client_id", self.client_id.clone()),
                ("client_secret", self.client_secret.clone()),
                ("refresh_token", refresh_token.to_string()),
            ])
            .await?;

        let access_token = payload
            .access_token
            .ok_or_else(|| oauth_error("Token response missing 'access_token' field"))?;

        Ok(TokenData::new(
            &access_token,
            payload.refresh_token.or_else(|| Some(refresh_token.to_string())),
            payload.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        ))
    }

    /// Return a usable token for what was stored, refreshing if needed
    pub async fn valid_token(&self, stored: Option<TokenData>) -> TokenStatus {
        let Some(token) = stored else {
            return TokenStatus::Missing;
        };

        if !token.is_expired() {
            return TokenStatus::Valid(token);
        }

        let Some(refresh_token) = token.refresh_token.as_deref() else {
            return TokenStatus::Expired;
        };

        match self.refresh_token(refresh_token).await {
            Ok(fresh) => {
                info!("Refreshed expired access token");
                TokenStatus::Refreshed(fresh)
            }
            Err(e) => {
                warn!("Error refreshing token: {}", e);
                TokenStatus::Expired
            }
        }
    }

    async fn post_form(&self, params: &[(&str, String)]) -> WrappedResult<TokenResponsePayload> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| oauth_error(&format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| oauth_error(&format!("Failed reading token response: {}", e)))?;

        let payload: TokenResponsePayload = serde_json::from_str(&body)
            .map_err(|e| oauth_error(&format!("Invalid token response: {}; body={}", e, body)))?;

        if !status.is_success() || payload.error.is_some() {
            let code = payload
                .error
                .unwrap_or_else(|| format!("http_{}", status.as_u16()));
            let detail = payload.error_description.unwrap_or(body);
            return Err(oauth_error(&format!("Token endpoint error: {}; {}", code, detail)));
        }

        Ok(payload)
    }
}
