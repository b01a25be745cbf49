//! Configuration for civic-hero, read from `.civic/civic.toml`.
//!
//! Settings are layered file → environment → CLI. Every section has
//! defaults, so a missing file or a partial one is fine.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! db_path = ".civic/civic.db"
//! dev = false
//!
//! [auth]
//! allow_anonymous_writes = false
//!
//! [estimator]
//! model = "gpt-4o"
//! base_url = "https://api.openai.com/v1"
//! temperature = 0.7
//! max_tokens = 1500
//!
//! [logging]
//! format = "compact"
//! filter = "civic_hero=info,warn"
//! ```
//!
//! The estimation API key is never stored in the file; it comes from
//! `OPENAI_API_KEY` (a `.env` file is honored).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::board::auth::AccessPolicy;

pub const CONFIG_DIR: &str = ".civic";
pub const CONFIG_FILE: &str = "civic.toml";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// HTTP listener and storage location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Permissive CORS for a UI dev server on another origin.
    #[serde(default)]
    pub dev: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

fn default_db_path() -> PathBuf {
    Path::new(CONFIG_DIR).join("civic.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthSection {
    /// Let requests without a bearer token mutate the board.
    #[serde(default)]
    pub allow_anonymous_writes: bool,
}

impl AuthSection {
    pub fn to_policy(&self) -> AccessPolicy {
        AccessPolicy {
            allow_anonymous_writes: self.allow_anonymous_writes,
        }
    }
}

/// OpenAI-compatible chat-completions settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatorSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1500
}

impl Default for EstimatorSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: compact, json", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_log_filter() -> String {
    "civic_hero=info,warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            filter: default_log_filter(),
        }
    }
}

impl LoggingSection {
    /// Unknown formats fall back to compact; `validate` reports them.
    pub fn log_format(&self) -> LogFormat {
        self.format.parse().unwrap_or(LogFormat::Compact)
    }
}

/// The complete civic.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CivicToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub estimator: EstimatorSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl CivicToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse civic.toml")
    }

    /// Load `civic.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize civic.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CIVIC_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CIVIC_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid CIVIC_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("CIVIC_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(allow) = lookup("CIVIC_ALLOW_ANONYMOUS_WRITES") {
            self.auth.allow_anonymous_writes = parse_bool(&allow)
                .with_context(|| format!("Invalid CIVIC_ALLOW_ANONYMOUS_WRITES '{}'", allow))?;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.estimator.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.estimator.base_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("Invalid server.port 0: choose a fixed port".to_string());
        }
        if !(0.0..=2.0).contains(&self.estimator.temperature) {
            warnings.push(format!(
                "Invalid estimator.temperature {}: must be between 0 and 2",
                self.estimator.temperature
            ));
        }
        if let Err(e) = self.logging.format.parse::<LogFormat>() {
            warnings.push(e.to_string());
        }

        warnings
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// CLI overrides for the `serve` and `init` commands.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub dev: bool,
}

/// Effective configuration: civic.toml + environment + CLI flags.
#[derive(Debug, Clone)]
pub struct CivicConfig {
    /// Where civic.toml was (or would be) read from.
    pub config_path: PathBuf,
    pub toml: CivicToml,
    pub verbose: bool,
}

impl CivicConfig {
    /// Load from `config_path`, or `.civic/civic.toml` when `None`.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(config_path: Option<&Path>, verbose: bool) -> Result<Self> {
        let mut toml = match config_path {
            Some(path) => CivicToml::load(path)?,
            None => CivicToml::load_or_default(Path::new(CONFIG_DIR))?,
        };
        toml.apply_env(|key| std::env::var(key).ok())?;

        Ok(Self {
            config_path: config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE)),
            toml,
            verbose,
        })
    }

    pub fn from_toml(toml: CivicToml) -> Self {
        Self {
            config_path: Path::new(CONFIG_DIR).join(CONFIG_FILE),
            toml,
            verbose: false,
        }
    }

    pub fn apply_overrides(&mut self, overrides: ServerOverrides) {
        if let Some(host) = overrides.host {
            self.toml.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.toml.server.port = port;
        }
        if let Some(path) = overrides.db_path {
            self.toml.server.db_path = path;
        }
        if overrides.dev {
            self.toml.server.dev = true;
        }
    }

    pub fn server(&self) -> &ServerSection {
        &self.toml.server
    }

    pub fn estimator(&self) -> &EstimatorSection {
        &self.toml.estimator
    }

    pub fn logging(&self) -> &LoggingSection {
        &self.toml.logging
    }

    pub fn access_policy(&self) -> AccessPolicy {
        self.toml.auth.to_policy()
    }

    /// The estimation API key, if set and non-empty.
    pub fn api_key() -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
