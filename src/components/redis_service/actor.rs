use crate::components::history::{decode_record, Entry, HistoryRecord, HistorySink};
use crate::error::{storage_error, AppResult};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// Redis key constants
pub mod keys {
    pub const HISTORY: &str = "gcal_history";
    pub const LEGACY_LOCAL_HISTORY: &str = "gcal_history:local";
    pub const CACHED_EVENTS: &str = "cached_events";
    pub const GOOGLE_CALENDAR_TOKEN: &str = "google_calendar_token";
}

/// The Redis actor that processes messages
pub struct RedisActor {
    client: RedisClient,
    connection: Option<MultiplexedConnection>,
    command_rx: mpsc::Receiver<RedisCommand>,
}

/// Commands that can be sent to the Redis actor
pub enum RedisCommand {
    SaveCachedEvents(Vec<Entry>, mpsc::Sender<AppResult<()>>),
    GetCachedEvents(mpsc::Sender<AppResult<Vec<Entry>>>),
    ClearCachedEvents(mpsc::Sender<AppResult<()>>),
    LoadHistory(mpsc::Sender<AppResult<HistoryRecord>>),
    SaveHistory(HistoryRecord, Option<mpsc::Sender<AppResult<()>>>),
    GetToken(mpsc::Sender<AppResult<Option<Value>>>),
    SaveToken(Value, mpsc::Sender<AppResult<()>>),
    Shutdown,
}

/// Handle for communicating with the Redis actor
#[derive(Clone)]
pub struct RedisActorHandle {
    command_tx: mpsc::Sender<RedisCommand>,
}

impl RedisActorHandle {
    /// Create a new empty handle for initialization purposes
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(32);
        Self { command_tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(mpsc::Sender<AppResult<T>>) -> RedisCommand,
    ) -> AppResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| storage_error("Response channel closed"))?
    }

    /// Save the merged event snapshot
    pub async fn save_cached_events(&self, events: Vec<Entry>) -> AppResult<()> {
        self.request(|tx| RedisCommand::SaveCachedEvents(events, tx))
            .await
    }

    /// Get the merged event snapshot, empty when none is cached
    pub async fn get_cached_events(&self) -> AppResult<Vec<Entry>> {
        self.request(RedisCommand::GetCachedEvents).await
    }

    pub async fn clear_cached_events(&self) -> AppResult<()> {
        self.request(RedisCommand::ClearCachedEvents).await
    }

    /// Load the history record, migrating older shapes and locations
    pub async fn load_history(&self) -> AppResult<HistoryRecord> {
        self.request(RedisCommand::LoadHistory).await
    }

    pub async fn save_history(&self, record: HistoryRecord) -> AppResult<()> {
        self.request(|tx| RedisCommand::SaveHistory(record, Some(tx)))
            .await
    }

    /// Enqueue a history write without waiting for it
    pub fn queue_history(&self, record: HistoryRecord) -> AppResult<()> {
        self.command_tx
            .try_send(RedisCommand::SaveHistory(record, None))
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))
    }

    /// Get token from Redis
    pub async fn get_token(&self) -> AppResult<Option<Value>> {
        self.request(RedisCommand::GetToken).await
    }

    /// Save token to Redis
    pub async fn save_token(&self, token: Value) -> AppResult<()> {
        self.request(|tx| RedisCommand::SaveToken(token, tx)).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(RedisCommand::Shutdown).await;
        Ok(())
    }
}

impl HistorySink for RedisActorHandle {
    fn persist(&self, record: &HistoryRecord) -> AppResult<()> {
        self.queue_history(record.clone())
    }
}

impl RedisActor {
    /// Create a new actor and return its handle
    pub fn new(redis_url: &str) -> AppResult<(Self, RedisActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let client = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;

        let actor = Self {
            client,
            connection: None,
            command_rx,
        };

        let handle = RedisActorHandle { command_tx };

        Ok((actor, handle))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Redis actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RedisCommand::SaveCachedEvents(events, response_tx) => {
                    let result = self.write_json(keys::CACHED_EVENTS, &events).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::GetCachedEvents(response_tx) => {
                    let result = self.read_cached_events().await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::ClearCachedEvents(response_tx) => {
                    let result = self.delete(keys::CACHED_EVENTS).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::LoadHistory(response_tx) => {
                    let result = self.load_history().await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::SaveHistory(record, response_tx) => {
                    let result = self.write_json(keys::HISTORY, &record).await;
                    match response_tx {
                        Some(response_tx) => {
                            let _ = response_tx.send(result).await;
                        }
                        None => {
                            if let Err(e) = result {
                                warn!("Queued history write failed: {}", e);
                            }
                        }
                    }
                }
                RedisCommand::GetToken(response_tx) => {
                    let result = self.read_json(keys::GOOGLE_CALENDAR_TOKEN).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::SaveToken(token, response_tx) => {
                    let result = self.write_json(keys::GOOGLE_CALENDAR_TOKEN, &token).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::Shutdown => {
                    info!("Redis actor shutting down");
                    break;
                }
            }
        }

        info!("Redis actor shut down");
    }

    /// Get a redis connection, reusing the multiplexed one once established
    async fn connection(&mut self) -> AppResult<MultiplexedConnection> {
        if let Some(connection) = &self.connection {
            return Ok(connection.clone());
        }

        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))?;
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    async fn read_json(&mut self, key: &str) -> AppResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| storage_error(&format!("Failed to read {} from Redis: {}", key, e)))?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: serde::Serialize>(&mut self, key: &str, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;
        let _: () = conn
            .set(key, json)
            .await
            .map_err(|e| storage_error(&format!("Failed to save {} to Redis: {}", key, e)))?;
        debug!("Wrote {}", key);
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| storage_error(&format!("Failed to delete {} from Redis: {}", key, e)))?;
        Ok(())
    }

    async fn read_cached_events(&mut self) -> AppResult<Vec<Entry>> {
        match self.read_json(keys::CACHED_EVENTS).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Primary record first, then the older local record which is moved over
    async fn load_history(&mut self) -> AppResult<HistoryRecord> {
        if let Some(value) = self.read_json(keys::HISTORY).await? {
            let decoded = decode_record(value)?;
            if decoded.migrated {
                info!("Converting legacy history record ({} items)", decoded.record.items.len());
                self.write_json(keys::HISTORY, &decoded.record).await?;
            }
            return Ok(decoded.record);
        }

        let Some(value) = self.read_json(keys::LEGACY_LOCAL_HISTORY).await? else {
            return Ok(HistoryRecord::default());
        };

        let decoded = decode_record(value)?;
        info!(
            "Moving history record from {} ({} items)",
            keys::LEGACY_LOCAL_HISTORY,
            decoded.record.items.len()
        );
        self.write_json(keys::HISTORY, &decoded.record).await?;
        self.delete(keys::LEGACY_LOCAL_HISTORY).await?;
        Ok(decoded.record)
    }
}
