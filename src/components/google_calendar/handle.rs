use super::actor::{GoogleCalendarActor, GoogleCalendarActorHandle};
use crate::components::history::Entry;
use crate::components::page::RefreshRequester;
use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::AppResult;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Capacity of the snapshot broadcast; slow subscribers skip to the newest
const SNAPSHOT_CHANNEL_CAPACITY: usize = 4;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    snapshots: broadcast::Sender<Vec<Entry>>,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(config: Arc<RwLock<Config>>, redis_handle: RedisActorHandle) -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        let (mut actor, handle) = GoogleCalendarActor::new(config, redis_handle, snapshots.clone());

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            snapshots,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Current merged snapshot of past events, newest first
    pub async fn get_events(&self, force_refresh: bool) -> AppResult<Vec<Entry>> {
        self.actor_handle.get_events(force_refresh).await
    }

    pub async fn force_refresh(&self) -> AppResult<Vec<Entry>> {
        self.actor_handle.force_refresh().await
    }

    pub fn silent_refresh(&self) -> AppResult<()> {
        self.actor_handle.silent_refresh()
    }

    /// Receive every snapshot published after a refresh
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Entry>> {
        self.snapshots.subscribe()
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.actor_handle.shutdown().await
    }
}

impl RefreshRequester for GoogleCalendarHandle {
    fn request_silent_refresh(&self) {
        if let Err(e) = self.silent_refresh() {
            warn!("Silent refresh request dropped: {}", e);
        }
    }

    fn request_events(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            match handle.get_events(false).await {
                Ok(items) if !items.is_empty() => {
                    if handle.snapshots.send(items).is_err() {
                        debug!("No snapshot subscribers left");
                    }
                }
                Ok(_) => debug!("Requested events came back empty"),
                Err(e) => warn!("Failed to load requested events: {}", e),
            }
        });
    }
}
