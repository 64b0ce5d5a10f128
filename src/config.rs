use crate::error::{config_error, env_error, AppResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default Redis URL used when `REDIS_URL` is not set
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Location of the optional page tuning file
pub const PAGE_SETTINGS_PATH: &str = "config/page.toml";

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google Calendar API client ID
    pub google_client_id: String,
    /// Google Calendar API client secret
    pub google_client_secret: String,
    /// Redis connection URL
    pub redis_url: String,
    /// Locale for user-visible overlay strings
    pub locale: String,
    /// How far back the event history reaches
    pub lookback_days: i64,
    /// Per-calendar `maxResults` for event listing
    pub max_results_per_calendar: usize,
    /// Interval between background refreshes
    pub refresh_interval_secs: u64,
    /// Tunables for the in-page engine
    pub page: PageSettings,
}

/// Tunables for the in-page suggestion engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    /// Maximum number of rows rendered in the overlay
    pub max_suggestions: usize,
    /// Minimum overlay width in pixels
    pub overlay_min_width: f64,
    /// Delay before a blur closes the overlay
    pub blur_grace_ms: u64,
    /// Delay between opening the calendar menu and searching its options
    pub calendar_settle_ms: u64,
    /// Delay between a save click and the silent refresh request
    pub save_refresh_delay_ms: u64,
    /// Capacity for user-authored saves and for the persisted history record
    pub history_cap: usize,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            max_suggestions: 5,
            overlay_min_width: 350.0,
            blur_grace_ms: 200,
            calendar_settle_ms: 300,
            save_refresh_delay_ms: 1500,
            history_cap: 30,
        }
    }
}

impl PageSettings {
    pub fn blur_grace(&self) -> Duration {
        Duration::from_millis(self.blur_grace_ms)
    }

    pub fn calendar_settle(&self) -> Duration {
        Duration::from_millis(self.calendar_settle_ms)
    }

    pub fn save_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.save_refresh_delay_ms)
    }

    /// Load page settings from a TOML file, falling back to defaults when it is missing
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: PageSettings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_suggestions == 0 {
            return Err(config_error("max_suggestions must be at least 1"));
        }
        if self.history_cap == 0 {
            return Err(config_error("history_cap must be at least 1"));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
        let google_client_secret =
            env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;

        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        let locale = env::var("APP_LOCALE").unwrap_or_else(|_| String::from("en"));

        let lookback_days = parse_env_or("LOOKBACK_DAYS", 365)?;
        let max_results_per_calendar = parse_env_or("MAX_RESULTS_PER_CALENDAR", 2500)?;
        let refresh_interval_secs = parse_env_or("REFRESH_INTERVAL_SECS", 1800)?;

        let page = PageSettings::load_from(Path::new(PAGE_SETTINGS_PATH))?;

        Ok(Config {
            google_client_id,
            google_client_secret,
            redis_url,
            locale,
            lookback_days,
            max_results_per_calendar,
            refresh_interval_secs,
            page,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> AppResult<T> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format", var))),
        Err(_) => Ok(default),
    }
}
