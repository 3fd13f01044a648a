//! Configuration — YAML config + env var overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::display::{DisplayConfig, DisplayOverrides};
use crate::log::DEFAULT_CAPACITY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the frame server; `/state`, `/hist` and `/ws` hang off it
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Fixed wait between a lost push connection and the next attempt
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Bounded log capacity
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Only show these channels (case-insensitive); empty shows everything
    #[serde(default)]
    pub channels: Vec<String>,

    /// Local colour defaults, `role:colour,...`; the server still overrides
    #[serde(default)]
    pub colors: Option<String>,

    /// Timeout for the `/state` and `/hist` requests
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_server_url() -> String {
    "http://localhost:8080".into()
}
fn default_reconnect_delay_ms() -> u64 {
    3000
}
fn default_max_messages() -> usize {
    DEFAULT_CAPACITY
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.yaml` from a directory, falling back to defaults (plus env
    /// overrides) when the file does not exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.yaml");
        if config_path.is_file() {
            return Self::load(&config_path);
        }
        let mut config = Config::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CHATFRAME_SERVER") {
            self.server_url = url;
        }
        if let Ok(ms) = std::env::var("CHATFRAME_RECONNECT_MS") {
            self.reconnect_delay_ms = ms
                .parse()
                .with_context(|| format!("CHATFRAME_RECONNECT_MS is not a number: {}", ms))?;
        }
        if let Ok(n) = std::env::var("CHATFRAME_MAX_MESSAGES") {
            self.max_messages = n
                .parse()
                .with_context(|| format!("CHATFRAME_MAX_MESSAGES is not a number: {}", n))?;
        }
        if let Ok(list) = std::env::var("CHATFRAME_CHANNELS") {
            self.channels = list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if let Ok(spec) = std::env::var("CHATFRAME_COLORS") {
            self.colors = Some(spec);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("Invalid server_url: {}", self.server_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("server_url must be http or https, got '{}'", url.scheme());
        }
        if self.max_messages == 0 {
            anyhow::bail!("max_messages must be at least 1");
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Built-in colours with the local `colors` spec applied.
    pub fn display_defaults(&self) -> DisplayConfig {
        let mut display = DisplayConfig::default();
        if let Some(ref spec) = self.colors {
            display.merge(&DisplayOverrides::parse_spec(spec));
        }
        display
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_messages: default_max_messages(),
            channels: Vec::new(),
            colors: None,
            request_timeout_secs: None,
        }
    }
}
