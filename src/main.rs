use gcal_history::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting gcal-history");

    let reset_cache = std::env::args().skip(1).any(|arg| arg == "--reset-cache");

    // Load configuration
    let config = startup::load_config().await?;

    // Start the service
    startup::start_service(config, reset_cache).await
}
