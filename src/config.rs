use crate::error::{config_error, env_error, WrappedResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Secret used to sign session cookies when SESSION_SECRET is not set
pub const DEFAULT_SESSION_SECRET: &str = "calendar_wrapped_dev_secret";

/// Optional overrides file, relative to the working directory
pub const SETTINGS_FILE: &str = "config/wrapped.toml";

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Redirect URI registered for the OAuth client
    pub google_redirect_uri: String,
    /// Secret for signing the session cookie
    pub session_secret: String,
    /// Redis connection URL; in-memory storage when absent
    pub redis_url: Option<String>,
    /// Address to bind the HTTP server to
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
    /// IANA time zone used for day boundaries
    pub timezone: String,
    /// Mark cookies as Secure
    pub secure_cookies: bool,
}

/// Keys accepted in `config/wrapped.toml`
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub timezone: Option<String>,
    pub secure_cookies: Option<bool>,
    pub redis_url: Option<String>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> WrappedResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
        let google_client_secret =
            env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;
        let google_redirect_uri =
            env::var("GOOGLE_REDIRECT_URI").map_err(|_| env_error("GOOGLE_REDIRECT_URI"))?;

        let session_secret = env::var("SESSION_SECRET").unwrap_or_else(|_| {
            warn!("SESSION_SECRET not set, using the development secret");
            DEFAULT_SESSION_SECRET.to_string()
        });

        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| config_error("Invalid PORT format"))?,
            Err(_) => 3000,
        };

        let secure_cookies = env::var("SECURE_COOKIES")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut config = Config {
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            session_secret,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            timezone: env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC")),
            secure_cookies,
        };

        if Path::new(SETTINGS_FILE).exists() {
            let content = fs::read_to_string(SETTINGS_FILE)?;
            config.apply_settings(toml::from_str(&content)?);
        }

        // Fail early on an unknown zone
        config.tz()?;

        Ok(config)
    }

    /// Merge overrides read from the settings file
    pub fn apply_settings(&mut self, settings: FileSettings) {
        if let Some(bind_address) = settings.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(port) = settings.port {
            self.port = port;
        }
        if let Some(timezone) = settings.timezone {
            self.timezone = timezone;
        }
        if let Some(secure) = settings.secure_cookies {
            self.secure_cookies = secure;
        }
        if let Some(redis_url) = settings.redis_url {
            self.redis_url = Some(redis_url).filter(|url| !url.is_empty());
        }
    }

    /// Parsed time zone
    pub fn tz(&self) -> WrappedResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }

    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
