use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{MunAssistantError, Result};

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GEMINI_API_KEY";

/// Main configuration structure for the MUN assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// No local timeout unless set
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub bind: String,
    pub path: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Stdio,
            bind: "127.0.0.1:8787".to_string(),
            path: "/mcp".to_string(),
            bearer_token: None,
        }
    }
}

impl TransportConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|e| {
            MunAssistantError::Config(format!(
                "Invalid transport bind '{}' (expected host:port): {e}",
                self.bind
            ))
        })
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Fails only when the result cannot serve any feature (no API key, bad bind address).
    pub fn load() -> Result<Self> {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path = env::var("MUN_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::from_file(&config_path);

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Reads a YAML config, falling back to defaults when it is missing or unreadable.
    fn from_file(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(name) = var("MUN_SERVER_NAME") {
            self.server.name = name;
        }

        // Gemini overrides; API_KEY is the legacy name
        if let Some(api_key) = var("GEMINI_API_KEY").or_else(|| var("API_KEY")) {
            self.gemini.api_key = api_key;
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = var("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(timeout) = var("GEMINI_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(secs) => self.gemini.timeout_seconds = Some(secs),
                Err(_) => tracing::warn!("Ignoring invalid GEMINI_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        // Transport overrides
        if let Some(kind) = var("MUN_TRANSPORT") {
            match kind.to_ascii_lowercase().as_str() {
                "http" | "streamable_http" => self.transport.kind = TransportKind::Http,
                "stdio" => self.transport.kind = TransportKind::Stdio,
                other => tracing::warn!("Unknown MUN_TRANSPORT '{}', keeping {:?}", other, self.transport.kind),
            }
        }
        if let Some(bind) = var("MUN_HTTP_BIND") {
            self.transport.bind = bind;
        }
        if let Some(path) = var("MUN_HTTP_PATH") {
            self.transport.path = path;
        }
        if let Some(token) = var("MUN_BEARER_TOKEN") {
            self.transport.bearer_token = Some(token).filter(|t| !t.is_empty());
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() || self.gemini.api_key == PLACEHOLDER_API_KEY {
            return Err(MunAssistantError::Config(
                "GEMINI_API_KEY (or API_KEY) environment variable must be set".to_string(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(MunAssistantError::Config("gemini.model cannot be empty".to_string()));
        }
        if self.gemini.timeout_seconds == Some(0) {
            return Err(MunAssistantError::Config(
                "gemini.timeout_seconds must be greater than 0 when set".to_string(),
            ));
        }
        if self.transport.kind == TransportKind::Http {
            self.transport.bind_addr()?;
            if !self.transport.path.starts_with('/') {
                return Err(MunAssistantError::Config(format!(
                    "transport.path must start with '/', got '{}'",
                    self.transport.path
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mun-assistant".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            gemini: GeminiConfig {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                timeout_seconds: None,
            },
            transport: TransportConfig::default(),
        }
    }
}
