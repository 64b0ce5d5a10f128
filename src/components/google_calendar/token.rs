use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::{google_calendar_error, AppResult};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Seconds before expiry at which a token is already treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Hands out access tokens from the OAuth token stored in Redis
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<RwLock<Config>>,
    redis_handle: RedisActorHandle,
    client: Client,
}

impl TokenManager {
    pub fn new(config: Arc<RwLock<Config>>, redis_handle: RedisActorHandle, client: Client) -> Self {
        Self {
            config,
            redis_handle,
            client,
        }
    }

    /// A valid access token, refreshed first when the stored one expired
    pub async fn get_access_token(&self) -> AppResult<String> {
        let token = self.redis_handle.get_token().await?.ok_or_else(|| {
            google_calendar_error("No token stored. Run get_calendar_token first.")
        })?;

        let expires_at = token.get("expires_at").and_then(|v| v.as_i64()).unwrap_or(0);
        let token = if expires_at - EXPIRY_MARGIN_SECS > Utc::now().timestamp() {
            token
        } else {
            debug!("Access token expired, refreshing");
            self.refresh_token(&token).await?
        };

        token
            .get("access_token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| google_calendar_error("No access token available"))
    }

    /// Mark the stored access token as expired so the next request refreshes it
    pub async fn invalidate(&self) -> AppResult<()> {
        let Some(mut token) = self.redis_handle.get_token().await? else {
            return Ok(());
        };
        if let Some(fields) = token.as_object_mut() {
            fields.insert("expires_at".to_string(), json!(0));
        }
        self.redis_handle.save_token(token).await?;
        info!("Access token invalidated");
        Ok(())
    }

    /// Refresh an expired token
    async fn refresh_token(&self, token: &Value) -> AppResult<Value> {
        let refresh_token = token
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| google_calendar_error("No refresh token in token data"))?;

        let (client_id, client_secret) = {
            let config_read = self.config.read().await;
            (
                config_read.google_client_id.clone(),
                config_read.google_client_secret.clone(),
            )
        };

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token.to_string()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let new_token: Value = response.json().await.map_err(|e| {
            google_calendar_error(&format!("Failed to parse token response: {}", e))
        })?;

        let token_json = merge_refreshed(new_token, refresh_token, Utc::now().timestamp())?;
        self.redis_handle.save_token(token_json.clone()).await?;
        Ok(token_json)
    }
}

/// Combine a refresh response with the existing refresh token
pub fn merge_refreshed(new_token: Value, refresh_token: &str, now: i64) -> AppResult<Value> {
    let access_token = new_token
        .get("access_token")
        .cloned()
        .ok_or_else(|| google_calendar_error("Token response missing 'access_token' field"))?;

    let expires_in = new_token
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);

    Ok(json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_at": now + expires_in,
    }))
}
