use crate::components::event_store::{InMemoryStorage, RedisStorage, StateStorage};
use crate::components::google_calendar::GoogleCalendarClient;
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use crate::web::{self, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Redis when configured and reachable, otherwise process memory
pub async fn select_storage(config: &Config) -> Arc<dyn StateStorage> {
    let Some(url) = config.redis_url.as_deref() else {
        info!("REDIS_URL not set, keeping event data in memory");
        return Arc::new(InMemoryStorage::new());
    };

    let storage = match RedisStorage::new(url) {
        Ok(storage) => storage,
        Err(e) => {
            error!("Invalid Redis configuration, falling back to memory: {}", e);
            return Arc::new(InMemoryStorage::new());
        }
    };

    match storage.ping().await {
        Ok(()) => {
            info!("Connected to Redis");
            Arc::new(storage)
        }
        Err(e) => {
            warn!("Redis unreachable, falling back to memory: {}", e);
            Arc::new(InMemoryStorage::new())
        }
    }
}

/// Build the app and serve it until shutdown
pub async fn start_server(config: Config) -> miette::Result<()> {
    let storage = select_storage(&config).await;
    let calendar = Arc::new(GoogleCalendarClient::new()?);
    let state = AppState::new(&config, calendar, storage)?;
    let app = web::router(state);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await.map_err(Error::from)?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}
