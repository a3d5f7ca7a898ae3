//! Persistent sync configuration model and file-backed manager.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempo_api::config::{DEFAULT_TEMPO_API_BASE, DEFAULT_TIMEOUT_SECS};
use tempo_api::{JiraConfig, TempoConfig, WireTimeZone};

/// Default upper bound for a single API call, in seconds.
fn default_call_deadline_secs() -> u64 {
    120
}

fn default_wire_time_zone() -> String {
    "local".to_string()
}

/// Represents the configuration persisted on disk: Jira and Tempo endpoints, the wire time zone, and request limits. Tokens are not stored here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub jira_host: String,
    pub jira_email: String,
    pub tempo_base_url: String,
    #[serde(default = "default_wire_time_zone")]
    pub wire_time_zone: String,
    pub issue_cache_capacity: usize,
    pub request_timeout_secs: u64,
    /// `0` disables the per-call deadline.
    #[serde(default = "default_call_deadline_secs")]
    pub call_deadline_secs: u64,
}

impl Default for Config {
    /// Returns baseline config when no persisted settings are available.
    fn default() -> Self {
        Self {
            jira_host: String::new(),
            jira_email: String::new(),
            tempo_base_url: DEFAULT_TEMPO_API_BASE.to_string(),
            wire_time_zone: default_wire_time_zone(),
            issue_cache_capacity: 0,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            call_deadline_secs: default_call_deadline_secs(),
        }
    }
}

impl Config {
    /// Builds the Jira connection settings; host and email must be filled in.
    pub fn jira_config(&self, api_token: &str) -> Result<JiraConfig, String> {
        let host = self.jira_host.trim();
        let email = self.jira_email.trim();
        if host.is_empty() {
            return Err("jira_host is not configured".into());
        }
        if email.is_empty() {
            return Err("jira_email is not configured".into());
        }
        Ok(JiraConfig::new(host, email, api_token).with_timeout(self.request_timeout()))
    }

    pub fn tempo_config(&self, token: &str) -> Result<TempoConfig, String> {
        let zone = self.wire_time_zone()?;
        Ok(TempoConfig::new(token)
            .with_base_url(self.tempo_base_url.trim())
            .with_timeout(self.request_timeout())
            .with_issue_cache_capacity(self.issue_cache_capacity)
            .with_wire_time_zone(zone))
    }

    pub fn wire_time_zone(&self) -> Result<WireTimeZone, String> {
        self.wire_time_zone
            .parse::<WireTimeZone>()
            .map_err(|err| err.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn call_deadline(&self) -> Option<Duration> {
        (self.call_deadline_secs > 0).then(|| Duration::from_secs(self.call_deadline_secs))
    }
}

/// Manages loading and saving of the configuration as JSON, by default in the platform-specific config directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Creates a manager bound to the platform-specific config path.
    pub fn new() -> Result<Self, String> {
        let dirs = directories::ProjectDirs::from("io", "tempo-sync", "tempo-sync")
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        Ok(Self {
            path: dirs.config_dir().join("config.json"),
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads config from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Config {
        if !self.path.exists() {
            return Config::default();
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read {}: {}", self.path.display(), err);
                return Config::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            warn!("Ignoring invalid config {}: {}", self.path.display(), err);
            Config::default()
        })
    }

    /// Persists config to disk, creating parent directories when needed.
    pub fn save(&self, config: &Config) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
