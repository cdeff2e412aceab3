//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! Telegram, tools, worker pool and transport sections. Every section
//! defaults sensibly so an empty file is valid; only the bot token must be
//! supplied (from the file, the CLI or the environment) before starting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Maximum number of admitted-but-unprocessed jobs.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Deadline applied to each job from the moment it is admitted.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Locations searched, in order, when no explicit config path is given.
pub const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "./audio2voice.toml",
    "~/.config/audio2voice/config.toml",
    "/etc/audio2voice/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub tools: ToolsConfig,
    pub pool: PoolConfig,
    pub transport: TransportConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from an explicit file path. A missing or malformed
    /// file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load configuration from `path` if given, otherwise from the first
    /// existing default location, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_CONFIG_LOCATIONS {
            let expanded = PathBuf::from(shellexpand::tilde(candidate).as_ref());
            if expanded.is_file() {
                tracing::info!(path = %expanded.display(), "Loading config file");
                return Self::load(&expanded);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.check().is_err() {
            warnings.push("telegram.token is not set; the bot cannot start without it".into());
        }

        if let Some(ref url) = self.telegram.webhook_url {
            if !url.starts_with("https://") {
                warnings.push(format!(
                    "telegram.webhook_url '{url}' is not https; Telegram only delivers to https endpoints"
                ));
            }
            if self.telegram.debug {
                warnings.push(
                    "telegram.debug is enabled; the webhook is ignored and long polling is used"
                        .into(),
                );
            }
        }

        if self.telegram.webhook_secret.is_some() && self.telegram.webhook_url.is_none() {
            warnings.push("telegram.webhook_secret is set but webhook_url is not".into());
        }

        if self.pool.queue_capacity == 0 {
            warnings.push("pool.queue_capacity is 0; it will be raised to 1".into());
        }

        if self.pool.workers == Some(0) {
            warnings.push("pool.workers is 0; one worker will be started".into());
        }

        if self.pool.job_timeout_secs == 0 {
            warnings.push("pool.job_timeout_secs is 0; every job will time out".into());
        }

        if self.transport.max_inflight_messages == 0 {
            warnings.push("transport.max_inflight_messages is 0; it will be raised to 1".into());
        }

        warnings
    }

    /// Hard checks required before the bot can start.
    pub fn check(&self) -> Result<()> {
        match self.telegram.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err(Error::Config(
                "telegram token is required (set telegram.token, --token or TG_A2V_TOKEN)".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Bot API base URL; overridden in tests.
    pub api_base: String,
    /// Public https URL Telegram should deliver updates to. Unset means long
    /// polling.
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    /// Port the webhook listener binds on.
    pub port: u16,
    /// Force long polling and log every raw update.
    pub debug: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.telegram.org".into(),
            webhook_url: None,
            webhook_secret: None,
            port: 8080,
            debug: false,
        }
    }
}

/// Paths to external tool binaries. `None` means discover on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Conversion worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub queue_capacity: usize,
    /// Number of workers per generation. `None` uses the available
    /// parallelism.
    pub workers: Option<usize>,
    pub job_timeout_secs: u64,
    /// Parent directory for per-job workspaces. `None` uses the system temp
    /// directory.
    pub work_dir: Option<PathBuf>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers: None,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT.as_secs(),
            work_dir: None,
        }
    }
}

impl PoolConfig {
    /// Effective worker count, never below one.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Effective queue capacity, never below one.
    pub fn capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

/// Inbound update handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound on concurrently handled inbound messages.
    pub max_inflight_messages: usize,
    /// Server-side long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_inflight_messages: 64,
            poll_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.pool.queue_capacity, 100);
        assert_eq!(config.pool.job_timeout(), Duration::from_secs(120));
        assert_eq!(config.transport.max_inflight_messages, 64);
        assert_eq!(config.transport.poll_timeout_secs, 30);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.port, 8080);
        assert!(config.telegram.token.is_none());
        assert!(config.tools.ffmpeg_path.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [telegram]
            token = "123:abc"
            webhook_url = "https://bot.example.com/hook"
            webhook_secret = "s3cret"
            port = 9000

            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [pool]
            queue_capacity = 10
            workers = 3
            job_timeout_secs = 30

            [transport]
            max_inflight_messages = 8
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.port, 9000);
        assert_eq!(
            config.tools.ffmpeg_path,
            Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert_eq!(config.pool.worker_count(), 3);
        assert_eq!(config.pool.capacity(), 10);
        assert_eq!(config.pool.job_timeout(), Duration::from_secs(30));
        assert_eq!(config.transport.max_inflight_messages, 8);
        assert!(config.validate().is_empty());
        assert!(config.check().is_ok());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml("[pool\nworkers = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn worker_count_never_zero() {
        let pool = PoolConfig {
            workers: Some(0),
            ..PoolConfig::default()
        };
        assert_eq!(pool.worker_count(), 1);
        assert!(PoolConfig::default().worker_count() >= 1);
    }

    #[test]
    fn check_requires_token() {
        let mut config = Config::default();
        assert!(matches!(config.check(), Err(Error::Config(_))));
        config.telegram.token = Some("  ".into());
        assert!(config.check().is_err());
        config.telegram.token = Some("123:abc".into());
        assert!(config.check().is_ok());
    }

    #[test]
    fn validate_warnings() {
        let mut config = Config::default();
        config.telegram.webhook_url = Some("http://insecure.example.com".into());
        config.telegram.debug = true;
        config.pool.queue_capacity = 0;
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("telegram.token")));
        assert!(warnings.iter().any(|w| w.contains("not https")));
        assert!(warnings.iter().any(|w| w.contains("long polling")));
        assert!(warnings.iter().any(|w| w.contains("queue_capacity")));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio2voice.toml");
        std::fs::write(&path, "[pool]\nworkers = 2\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.pool.worker_count(), 2);
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
