//! Configuration types for feed-push

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Main configuration
///
/// Every section has defaults, so an empty JSON object is a valid starting
/// point; only `feed.url` and the VAPID key are needed to actually run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed source settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Web Push delivery settings
    #[serde(default)]
    pub push: PushConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Periodic cycle scheduling
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Trigger API
    #[serde(default)]
    pub api: ApiConfig,
}

/// Feed source configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL (RSS 2.0 or Atom)
    #[serde(default)]
    pub url: String,

    /// Timeout for a single feed request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// How long a fetched item is reused before refetching (default: 5 minutes)
    #[serde(default = "default_cache_ttl", with = "duration_serde")]
    pub cache_ttl: Duration,

    /// User-Agent header sent to the feed server
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum characters of the notification body (default: 180)
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Notification title used when the item has none
    #[serde(default = "default_title")]
    pub default_title: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            request_timeout: default_request_timeout(),
            cache_ttl: default_cache_ttl(),
            user_agent: default_user_agent(),
            summary_max_chars: default_summary_max_chars(),
            default_title: default_title(),
        }
    }
}

/// Web Push configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushConfig {
    /// Path to the VAPID private key in PEM format
    #[serde(default)]
    pub vapid_private_key_path: Option<PathBuf>,

    /// VAPID `sub` claim, a `mailto:` or `https:` contact
    #[serde(default = "default_vapid_subject")]
    pub vapid_subject: String,

    /// How long the push service keeps an undelivered message, in seconds (default: 1 day)
    #[serde(default = "default_push_ttl")]
    pub ttl_secs: u32,

    /// Timeout for a single delivery (default: 30 seconds)
    #[serde(default = "default_push_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_private_key_path: None,
            vapid_subject: default_vapid_subject(),
            ttl_secs: default_push_ttl(),
            timeout: default_push_timeout(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./feed-push.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Periodic cycle configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run cycles on a timer (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time between cycles (default: 15 minutes)
    #[serde(default = "default_check_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Run one cycle immediately at startup (default: true)
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_check_interval(),
            run_on_start: true,
        }
    }
}

/// Trigger API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:3001)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Shared secret required by the trigger endpoints when set
    #[serde(default)]
    pub trigger_token: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            trigger_token: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// Reads `.env` first (if present), then starts from the JSON file named by
    /// `FEED_PUSH_CONFIG` (or defaults) and overlays individual variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("FEED_PUSH_CONFIG") {
            Some(path) => Self::from_json_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(url) = lookup("FEED_URL") {
            config.feed.url = url;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            config.persistence.database_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("VAPID_PRIVATE_KEY_PATH") {
            config.push.vapid_private_key_path = Some(PathBuf::from(path));
        }
        if let Some(subject) = lookup("VAPID_SUBJECT") {
            config.push.vapid_subject = subject;
        }
        if let Some(token) = lookup("CRON_TOKEN").filter(|t| !t.is_empty()) {
            config.api.trigger_token = Some(token);
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            config.api.bind_address = addr.parse().map_err(|_| Error::Config {
                message: format!("BIND_ADDRESS must be a socket address, got '{}'", addr),
                key: Some("api.bind_address".to_string()),
            })?;
        }
        if let Some(secs) = lookup("CHECK_INTERVAL_SECS") {
            config.schedule.interval = Duration::from_secs(parse_secs(&secs, "CHECK_INTERVAL_SECS")?);
        }
        if let Some(secs) = lookup("FEED_CACHE_TTL_SECS") {
            config.feed.cache_ttl = Duration::from_secs(parse_secs(&secs, "FEED_CACHE_TTL_SECS")?);
        }

        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("invalid config file {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Check the settings a running service depends on
    pub fn validate(&self) -> Result<()> {
        if self.feed.url.trim().is_empty() {
            return Err(Error::Config {
                message: "feed URL is required".to_string(),
                key: Some("feed.url".to_string()),
            });
        }

        let parsed = url::Url::parse(&self.feed.url).map_err(|e| Error::Config {
            message: format!("invalid feed URL '{}': {}", self.feed.url, e),
            key: Some("feed.url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("feed URL must use http or https, got '{}'", parsed.scheme()),
                key: Some("feed.url".to_string()),
            });
        }

        if self.schedule.enabled && self.schedule.interval.is_zero() {
            return Err(Error::Config {
                message: "schedule interval must be greater than zero".to_string(),
                key: Some("schedule.interval".to_string()),
            });
        }

        if self.feed.summary_max_chars == 0 {
            return Err(Error::Config {
                message: "summary length must be greater than zero".to_string(),
                key: Some("feed.summary_max_chars".to_string()),
            });
        }

        Ok(())
    }
}

fn parse_secs(value: &str, key: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| Error::Config {
        message: format!("{} must be a whole number of seconds, got '{}'", key, value),
        key: Some(key.to_string()),
    })
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_user_agent() -> String {
    format!("feed-push/{}", env!("CARGO_PKG_VERSION"))
}

fn default_summary_max_chars() -> usize {
    crate::utils::DEFAULT_SUMMARY_CHARS
}

fn default_title() -> String {
    "New article".to_string()
}

fn default_vapid_subject() -> String {
    "mailto:admin@example.com".to_string()
}

fn default_push_ttl() -> u32 {
    24 * 60 * 60
}

fn default_push_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./feed-push.db")
}

fn default_check_interval() -> Duration {
    Duration::from_secs(15 * 60) // 15 minutes
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
