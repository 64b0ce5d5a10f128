use super::merge::merge_events;
use super::models::{CalendarEvent, CalendarInfo};
use super::token::TokenManager;
use crate::components::history::Entry;
use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::{google_calendar_error, AppResult};
use crate::utils::time::lookback_start;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

pub const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Commands that can be sent to the Google Calendar actor
pub enum GoogleCalendarCommand {
    GetEvents {
        force_refresh: bool,
        respond: mpsc::Sender<AppResult<Vec<Entry>>>,
    },
    ForceRefresh(mpsc::Sender<AppResult<Vec<Entry>>>),
    SilentRefresh,
    Shutdown,
}

/// Handle for communicating with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    /// Current merged snapshot; cached results are returned immediately
    pub async fn get_events(&self, force_refresh: bool) -> AppResult<Vec<Entry>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::GetEvents {
                force_refresh,
                respond: response_tx,
            })
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_calendar_error("Response channel closed"))?
    }

    /// Drop the access token and fetch again
    pub async fn force_refresh(&self) -> AppResult<Vec<Entry>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::ForceRefresh(response_tx))
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_calendar_error("Response channel closed"))?
    }

    /// Fire-and-forget refresh
    pub fn silent_refresh(&self) -> AppResult<()> {
        self.command_tx
            .try_send(GoogleCalendarCommand::SilentRefresh)
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }
}

/// Everything a fetch needs; cloned into background refresh tasks
#[derive(Clone)]
struct EventSource {
    config: Arc<RwLock<Config>>,
    token_manager: TokenManager,
    client: Client,
    redis_handle: RedisActorHandle,
    snapshots: broadcast::Sender<Vec<Entry>>,
}

impl EventSource {
    /// Fetch, cache and publish a fresh snapshot
    async fn refresh(&self) -> AppResult<Vec<Entry>> {
        let entries = self.fetch().await?;

        if let Err(e) = self.redis_handle.save_cached_events(entries.clone()).await {
            warn!("Failed to cache events: {}", e);
        }
        let receivers = self.snapshots.send(entries.clone()).unwrap_or(0);
        debug!("Published snapshot to {} subscriber(s)", receivers);

        Ok(entries)
    }

    /// Refresh in the background, only logging failures
    fn spawn_refresh(&self) {
        let source = self.clone();
        tokio::spawn(async move {
            if let Err(e) = source.refresh().await {
                warn!("Background refresh failed: {}", e);
            }
        });
    }

    async fn fetch(&self) -> AppResult<Vec<Entry>> {
        let (lookback_days, max_results) = {
            let config_read = self.config.read().await;
            (config_read.lookback_days, config_read.max_results_per_calendar)
        };

        let access_token = self.token_manager.get_access_token().await?;
        let calendars = self.list_calendars(&access_token).await?;
        info!("Found {} calendars", calendars.len());

        let time_min = lookback_start(Utc::now(), lookback_days);
        let fetches = calendars.iter().map(|calendar| {
            let access_token = access_token.as_str();
            let time_min = time_min.as_str();
            async move {
                match self
                    .list_events(access_token, calendar, time_min, max_results)
                    .await
                {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("Failed to fetch events for calendar {}: {}", calendar.summary, e);
                        Vec::new()
                    }
                }
            }
        });
        let events: Vec<CalendarEvent> = join_all(fetches).await.into_iter().flatten().collect();

        let entries = merge_events(events);
        info!(
            "Fetched {} unique events from {} calendars",
            entries.len(),
            calendars.len()
        );
        Ok(entries)
    }

    async fn list_calendars(&self, access_token: &str) -> AppResult<Vec<CalendarInfo>> {
        let url = api_url(&["users", "me", "calendarList"])?;
        let response_data = self.get_json(url, access_token).await?;

        Ok(response_data
            .get("items")
            .and_then(|i| i.as_array())
            .map(|items| items.iter().filter_map(CalendarInfo::from_json).collect())
            .unwrap_or_default())
    }

    async fn list_events(
        &self,
        access_token: &str,
        calendar: &CalendarInfo,
        time_min: &str,
        max_results: usize,
    ) -> AppResult<Vec<CalendarEvent>> {
        let mut url = api_url(&["calendars", &calendar.id, "events"])?;
        url.query_pairs_mut()
            .append_pair("timeMin", time_min)
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response_data = self.get_json(url, access_token).await?;

        Ok(response_data
            .get("items")
            .and_then(|i| i.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|event| CalendarEvent::from_json(event, calendar))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_json(&self, url: Url, access_token: &str) -> AppResult<Value> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse response: {}", e)))
    }
}

/// Build an API URL, percent-encoding each path segment
fn api_url(segments: &[&str]) -> AppResult<Url> {
    let mut url = Url::parse(CALENDAR_API)
        .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| google_calendar_error("Calendar API URL cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// The Google Calendar actor that processes messages
pub struct GoogleCalendarActor {
    source: EventSource,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: Arc<RwLock<Config>>,
        redis_handle: RedisActorHandle,
        snapshots: broadcast::Sender<Vec<Entry>>,
    ) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let client = Client::new();

        let source = EventSource {
            token_manager: TokenManager::new(
                Arc::clone(&config),
                redis_handle.clone(),
                client.clone(),
            ),
            config,
            client,
            redis_handle,
            snapshots,
        };

        let actor = Self { source, command_rx };
        let handle = GoogleCalendarActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                GoogleCalendarCommand::GetEvents {
                    force_refresh,
                    respond,
                } => {
                    let result = self.get_events(force_refresh).await;
                    let _ = respond.send(result).await;
                }
                GoogleCalendarCommand::ForceRefresh(respond) => {
                    if let Err(e) = self.source.token_manager.invalidate().await {
                        warn!("Failed to invalidate access token: {}", e);
                    }
                    let result = self.source.refresh().await;
                    if let Err(e) = &result {
                        error!("Forced refresh failed: {}", e);
                    }
                    let _ = respond.send(result).await;
                }
                GoogleCalendarCommand::SilentRefresh => {
                    self.source.spawn_refresh();
                }
                GoogleCalendarCommand::Shutdown => {
                    info!("Google Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Google Calendar actor shut down");
    }

    async fn get_events(&self, force_refresh: bool) -> AppResult<Vec<Entry>> {
        if !force_refresh {
            match self.source.redis_handle.get_cached_events().await {
                Ok(cached) if !cached.is_empty() => {
                    info!("Returning {} cached events", cached.len());
                    self.source.spawn_refresh();
                    return Ok(cached);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to read cached events: {}", e),
            }
        }

        info!("Fetching new events");
        self.source.refresh().await
    }
}
