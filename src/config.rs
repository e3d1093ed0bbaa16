use crate::models::MonitoringConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

/// Retry tuning for data operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOptions {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base delay between attempts, in milliseconds.
    pub delay_ms: u64,
    /// Exponential backoff (`delay * 2^attempt`) instead of a constant delay.
    pub backoff: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1000,
            backoff: true,
        }
    }
}

impl RetryOptions {
    /// Delay to sleep after a failed attempt (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let millis = if self.backoff {
            self.delay_ms.saturating_mul(1u64 << attempt.min(16))
        } else {
            self.delay_ms
        };
        Duration::from_millis(millis)
    }
}

/// Connection settings for the hosted database endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub url: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_role_key: Option<String>,
    #[serde(default)]
    pub retry: RetryOptions,
}

impl ConnectionSettings {
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            url,
            api_key,
            service_role_key: None,
            retry: RetryOptions::default(),
        }
    }

    /// Key sent as the bearer token; the service-role key wins when present.
    pub fn bearer_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.api_key)
    }
}

/// Storage backend for persisted connection settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Raw persisted payload, if any.
    async fn load(&self) -> Option<String>;

    /// Persist the raw payload.
    async fn save(&self, raw: &str) -> Result<(), ConfigError>;
}

/// File-backed settings store.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Option<String> {
        tokio::fs::read_to_string(&self.path).await.ok()
    }

    async fn save(&self, raw: &str) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ConfigError::Storage(e.to_string()))?;
            }
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| ConfigError::Storage(e.to_string()))
    }
}

/// In-memory settings store for tests and ephemeral sessions.
pub struct MemorySettingsStore {
    inner: RwLock<Option<String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub fn seeded(raw: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Some(raw.into())),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    async fn save(&self, raw: &str) -> Result<(), ConfigError> {
        *self.inner.write().await = Some(raw.to_string());
        Ok(())
    }
}

/// Repository over a settings store.
///
/// Absent or malformed persisted data means "not initialized", never a hard
/// failure; callers decide whether to prompt for configuration.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn SettingsStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub async fn load_settings(&self) -> Option<ConnectionSettings> {
        let raw = self.store.load().await?;
        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Persisted connection settings are malformed: {}", e);
                None
            }
        }
    }

    pub async fn save_settings(&self, settings: &ConnectionSettings) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(settings)
            .map_err(|e| ConfigError::Storage(e.to_string()))?;
        self.store.save(&raw).await
    }
}

/// Process-level configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub settings_path: String,
    pub trading_api_url: String,
    pub trading_api_username: String,
    pub trading_api_password: String,
    pub monitoring: MonitoringConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings_path = env::var("FUELOPS_SETTINGS_PATH")
            .unwrap_or_else(|_| "fuelops-settings.json".to_string());

        let trading_api_url =
            env::var("TRADING_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let trading_api_username =
            env::var("TRADING_API_USERNAME").map_err(|_| ConfigError::MissingTradingUsername)?;

        let trading_api_password =
            env::var("TRADING_API_PASSWORD").map_err(|_| ConfigError::MissingTradingPassword)?;

        let monitoring = MonitoringConfig {
            old_coupon_threshold_days: env::var("OLD_COUPON_THRESHOLD_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidThreshold("OLD_COUPON_THRESHOLD_DAYS"))?,
            critical_coupon_threshold_days: env::var("CRITICAL_COUPON_THRESHOLD_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidThreshold("CRITICAL_COUPON_THRESHOLD_DAYS"))?,
            large_amount_threshold: env::var("LARGE_AMOUNT_THRESHOLD")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidThreshold("LARGE_AMOUNT_THRESHOLD"))?,
        };

        Ok(AppConfig {
            settings_path,
            trading_api_url,
            trading_api_username,
            trading_api_password,
            monitoring,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TRADING_API_USERNAME environment variable not set")]
    MissingTradingUsername,

    #[error("TRADING_API_PASSWORD environment variable not set")]
    MissingTradingPassword,

    #[error("Invalid numeric value for {0}")]
    InvalidThreshold(&'static str),

    #[error("Settings storage error: {0}")]
    Storage(String),
}
