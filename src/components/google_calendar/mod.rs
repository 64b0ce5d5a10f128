mod actor;
mod handle;
pub mod merge;
pub mod models;
mod scheduler;
pub mod token;

pub use handle::GoogleCalendarHandle;
pub use models::{CalendarEvent, CalendarInfo};

use crate::config::Config;
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::google_calendar::scheduler::start_scheduler;
use super::redis_service::RedisActorHandle;

/// Background collaborator producing history snapshots from Google Calendar
#[derive(Default)]
pub struct GoogleCalendar {
    handle: RwLock<Option<GoogleCalendarHandle>>,
    scheduler: RwLock<Option<JoinHandle<()>>>,
}

impl GoogleCalendar {
    /// Create a new Google Calendar component
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<GoogleCalendarHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

#[async_trait]
impl super::Component for GoogleCalendar {
    fn name(&self) -> &'static str {
        "google_calendar"
    }

    async fn init(&self, config: Arc<RwLock<Config>>, redis_handle: RedisActorHandle) -> AppResult<()> {
        let handle = {
            let mut handle_lock = self.handle.write().await;
            handle_lock
                .get_or_insert_with(|| GoogleCalendarHandle::new(config.clone(), redis_handle))
                .clone()
        };

        let mut scheduler_lock = self.scheduler.write().await;
        if scheduler_lock.is_none() {
            *scheduler_lock = Some(start_scheduler(config, handle).await);
        }

        Ok(())
    }

    async fn shutdown(&self) -> AppResult<()> {
        if let Some(task) = self.scheduler.write().await.take() {
            task.abort();
        }

        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
