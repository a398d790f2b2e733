use chrono_tz::Tz;
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

const DEFAULT_UPLOADS_DIR: &str = "data/uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub listen_port: Option<u16>,
    #[serde(default)]
    pub dev_cors_origin: Option<String>,
    /// IANA zone name that decides which calendar day "today" is.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub uploads_dir: Option<PathBuf>,
    /// Prefix for returned upload URLs, e.g. `https://goals.example.com`.
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
    /// bcrypt work factor for passwords and PINs.
    #[serde(default)]
    pub bcrypt_cost: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown timezone: {0}")]
    Timezone(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        let cfg: AppConfig = serde_yaml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Minimal config for tests and tooling; every optional field unset.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            listen_port: None,
            dev_cors_origin: None,
            timezone: None,
            uploads_dir: None,
            public_base_url: None,
            max_upload_bytes: None,
            bcrypt_cost: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        if let Some(cost) = self.bcrypt_cost
            && !(4..=31).contains(&cost)
        {
            return Err(ConfigError::Invalid(format!(
                "bcrypt_cost must be within 4..=31, got {cost}"
            )));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        match self.timezone.as_deref() {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::Timezone(name.to_string())),
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost.unwrap_or(bcrypt::DEFAULT_COST)
    }

    pub fn public_base_url(&self) -> &str {
        self.public_base_url
            .as_deref()
            .map(|s| s.trim_end_matches('/'))
            .unwrap_or("")
    }
}
