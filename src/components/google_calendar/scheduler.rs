use super::handle::GoogleCalendarHandle;
use crate::config::Config;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

/// Start the periodic refresh loop
pub async fn start_scheduler(config: Arc<RwLock<Config>>, handle: GoogleCalendarHandle) -> JoinHandle<()> {
    let interval = {
        let config_read = config.read().await;
        Duration::from_secs(config_read.refresh_interval_secs.max(1))
    };
    info!("Refreshing events every {}s", interval.as_secs());

    tokio::spawn(async move {
        loop {
            sleep(interval).await;

            if let Err(e) = handle.silent_refresh() {
                error!("Failed to schedule refresh: {}", e);
            }
        }
    })
}
