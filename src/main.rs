use calendar_wrapped::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting Calendar Wrapped");

    // Load configuration
    let config = startup::load_config()?;

    // Serve until a shutdown signal arrives
    startup::start_server(config).await
}
