use crate::components::google_calendar::GoogleCalendar;
use crate::components::history::HistoryStore;
use crate::components::page::{PageActor, PageActorHandle, PageHost, StructureNotifier};
use crate::components::redis_service::{RedisActor, RedisActorHandle};
use crate::components::{ComponentManager, GoogleCalendarHandle};
use crate::config::{Config, PageSettings};
use crate::error::{AppResult, Error};
use crate::shutdown;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gcal_history=debug,hyper=warn,reqwest=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Spawn the Redis actor for `redis_url`
pub fn start_redis(redis_url: &str) -> AppResult<RedisActorHandle> {
    let (mut redis_actor, redis_handle) = RedisActor::new(redis_url)?;
    tokio::spawn(async move {
        redis_actor.run().await;
    });
    Ok(redis_handle)
}

/// Host the page engine for `page` on its own task.
///
/// The persisted history is loaded first; when a calendar handle is given,
/// its snapshots replace the history, saves request a silent refresh and
/// focusing a field asks for events again until a snapshot arrives.
pub async fn attach_page<P>(
    page: P,
    settings: PageSettings,
    redis_handle: RedisActorHandle,
    calendar: Option<GoogleCalendarHandle>,
) -> AppResult<PageActorHandle<P>>
where
    P: PageHost + StructureNotifier + Send + 'static,
{
    settings.validate()?;

    let mut store = HistoryStore::from_settings(&settings).with_sink(Box::new(redis_handle.clone()));
    match redis_handle.load_history().await {
        Ok(record) => {
            info!("Loaded {} history entries", record.items.len());
            store.load(record.items);
        }
        Err(e) => warn!("Failed to load history, starting empty: {}", e),
    }

    let (mut actor, handle) = PageActor::new(page, store, settings);

    if let Some(calendar) = calendar {
        actor = actor
            .with_snapshots(calendar.subscribe())
            .with_refresher(Box::new(calendar.clone()));

        let page_handle = handle.clone();
        tokio::spawn(async move {
            match calendar.get_events(false).await {
                Ok(items) => {
                    if let Err(e) = page_handle.snapshot(items).await {
                        warn!("Failed to deliver initial snapshot: {}", e);
                    }
                }
                Err(e) => warn!("Failed to load events, retrying on next focus: {}", e),
            }
        });
    }

    tokio::spawn(async move {
        actor.run().await;
    });

    Ok(handle)
}

/// Initialize and start the background refresh service
pub async fn start_service(config: Arc<RwLock<Config>>, reset_cache: bool) -> miette::Result<()> {
    // Set locale from config
    {
        let config_read = config.read().await;
        crate::utils::i18n::set_locale(&config_read.locale);
        info!("Setting locale to {}", config_read.locale);
    }

    // Initialize Redis service
    let redis_url = config.read().await.redis_url.clone();
    let redis_handle = start_redis(&redis_url)?;

    if reset_cache {
        redis_handle.clear_cached_events().await?;
        info!("Cleared cached events");
    }

    // Register components
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager.register(GoogleCalendar::new());
    let component_manager = Arc::new(component_manager);

    component_manager.init_all(redis_handle.clone()).await?;

    // Warm the cache so the first page load has a snapshot
    if let Some(calendar) = component_manager.get::<GoogleCalendar>() {
        if let Some(handle) = calendar.get_handle().await {
            match handle.get_events(false).await {
                Ok(items) => info!("Event snapshot ready with {} entries", items.len()),
                Err(e) => error!("Initial event fetch failed: {}", e),
            }
        }
    }

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    let shutdown_components = Arc::clone(&component_manager);
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components, redis_handle).await;
    });

    let _ = shutdown_recv.await;
    info!("Service stopped");
    Ok(())
}
