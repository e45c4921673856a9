//! Configuration for the peanut agent
//!
//! Handles loading and saving agent settings from the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, jobs_path, memory_path, state_path, workspace_path};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Inference gateway settings (Ollama-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embed_model: default_embed_model(),
            chat_timeout_secs: default_chat_timeout(),
            embed_timeout_secs: default_embed_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "qwen2.5-coder:7b".to_string()
}

fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_chat_timeout() -> u64 {
    120
}

fn default_embed_timeout() -> u64 {
    60
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,
    #[serde(default = "default_memory_top_k")]
    pub memory_top_k: usize,
    #[serde(default = "default_expert_threshold")]
    pub expert_threshold: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            max_iterations: default_max_iterations(),
            retry_ceiling: default_retry_ceiling(),
            memory_top_k: default_memory_top_k(),
            expert_threshold: default_expert_threshold(),
        }
    }
}

fn default_workspace() -> String {
    "~/.peanut/workspace".to_string()
}

fn default_max_iterations() -> u32 {
    15
}

fn default_retry_ceiling() -> u32 {
    3
}

fn default_memory_top_k() -> usize {
    2
}

fn default_expert_threshold() -> u64 {
    10
}

/// Tool execution timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_container_timeout")]
    pub container_timeout_secs: u64,
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell_timeout_secs: default_shell_timeout(),
            http_timeout_secs: default_http_timeout(),
            container_timeout_secs: default_container_timeout(),
            remote_timeout_secs: default_remote_timeout(),
        }
    }
}

fn default_shell_timeout() -> u64 {
    30
}

fn default_http_timeout() -> u64 {
    30
}

fn default_container_timeout() -> u64 {
    60
}

fn default_remote_timeout() -> u64 {
    60
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl Config {
    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Resolve the configured workspace to an absolute path
    pub fn workspace_path(&self) -> PathBuf {
        let path = &self.agent.workspace;
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        } else if path == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
        PathBuf::from(path)
    }
}

/// Create config and workspace on first run
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("config written to {:?}", config_path);
    }

    let config = Config::load().await?;
    let workspace = config.workspace_path();
    tokio::fs::create_dir_all(&workspace).await?;
    info!("workspace ready at {:?}", workspace);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.base_url, "http://localhost:11434");
        assert_eq!(config.gateway.chat_timeout_secs, 120);
        assert_eq!(config.gateway.embed_timeout_secs, 60);
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.agent.retry_ceiling, 3);
        assert_eq!(config.agent.memory_top_k, 2);
        assert_eq!(config.agent.expert_threshold, 10);
        assert_eq!(config.executor.shell_timeout_secs, 30);
        assert_eq!(config.executor.container_timeout_secs, 60);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"agent":{"max_iterations":5}}"#).unwrap();
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.retry_ceiling, 3);
        assert_eq!(config.gateway.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let mut config = Config::default();
        config.agent.max_iterations = 7;
        config.gateway.chat_model = "llama3".to_string();
        config.save_to(&path).await.unwrap();

        let loaded = Config::load_from(&path).await.unwrap();
        assert_eq!(loaded.agent.max_iterations, 7);
        assert_eq!(loaded.gateway.chat_model, "llama3");
    }

    #[tokio::test]
    async fn test_load_missing_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.json");

        let config = Config::load_from(&path).await.unwrap();
        assert_eq!(config.agent.retry_ceiling, 3);
    }

    #[test]
    fn test_workspace_path_tilde_expansion() {
        let mut config = Config::default();
        config.agent.workspace = "~/somewhere".to_string();
        let resolved = config.workspace_path();
        assert!(!resolved.to_string_lossy().contains('~'));

        config.agent.workspace = "/abs/path".to_string();
        assert_eq!(config.workspace_path(), PathBuf::from("/abs/path"));
    }
}
