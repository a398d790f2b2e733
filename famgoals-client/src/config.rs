use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::AgentError;

pub const ENV_CONFIG: &str = "FAMGOALS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub server_url: String,
    /// Member whose readings are pushed; set by `select-member`.
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// YAML export of daily health samples.
    pub health_export: PathBuf,
    #[serde(default)]
    pub token_storage: TokenStorage,
}

/// Where the session token is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    /// OS keyring, keyed by the normalized server URL.
    #[default]
    Keyring,
    /// Owner-only file next to the config, for headless hosts.
    File,
}

fn default_interval() -> u64 {
    300
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, AgentError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| AgentError::Config("could not determine config dir".into()))
}

pub fn default_config_path() -> Option<PathBuf> {
    let pd = ProjectDirs::from("dev", "famgoals", "famgoals")?;
    Some(pd.config_dir().join("agent.yaml"))
}

pub fn load_config(path: &Path) -> Result<AgentConfig, AgentError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AgentError::Config(format!("read {} failed: {e}", path.display())))?;
    serde_yaml::from_str(&data)
        .map_err(|e| AgentError::Config(format!("parse {} failed: {e}", path.display())))
}

pub fn save_config(path: &Path, cfg: &AgentConfig) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| AgentError::Config(format!("serialize config failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| AgentError::Config(format!("write {} failed: {e}", path.display())))
}

pub fn normalize_server_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    }
}
