//! Sources of daily health readings.
//!
//! A phone's health store is the natural source; on the desktop the agent
//! reads a YAML export with one sample per day:
//!
//! ```yaml
//! days:
//!   2025-03-14:
//!     steps: 8421
//!     water_ml: 1750
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::AgentError;

#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn is_available(&self) -> bool;
    /// Asks for read/write access. Returns whether it was granted.
    async fn request_authorization(&self) -> Result<bool, AgentError>;
    /// Cumulative step count for `date`.
    async fn fetch_steps(&self, date: NaiveDate) -> Result<i64, AgentError>;
    /// Cumulative water intake for `date`, in millilitres.
    async fn fetch_water(&self, date: NaiveDate) -> Result<f64, AgentError>;
    async fn save_water(&self, ml: f64, date: NaiveDate) -> Result<(), AgentError>;

    async fn fetch_today_steps(&self) -> Result<i64, AgentError> {
        self.fetch_steps(Local::now().date_naive()).await
    }

    async fn fetch_today_water(&self) -> Result<f64, AgentError> {
        self.fetch_water(Local::now().date_naive()).await
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySample {
    #[serde(default)]
    pub steps: i64,
    #[serde(default)]
    pub water_ml: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HealthExport {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DailySample>,
}

/// Health store backed by a YAML export file. The file is re-read on every
/// fetch so an external exporter can keep updating it.
pub struct FileHealthSource {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileHealthSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<HealthExport, AgentError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AgentError::Health(format!(
                    "health export {} not found",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(HealthExport::default());
        }
        serde_yaml::from_str(&data).map_err(|e| {
            AgentError::Health(format!("parse {} failed: {e}", self.path.display()))
        })
    }

    async fn write(&self, export: &HealthExport) -> Result<(), AgentError> {
        let data = serde_yaml::to_string(export)
            .map_err(|e| AgentError::Health(format!("serialize health export failed: {e}")))?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    async fn sample(&self, date: NaiveDate) -> Result<DailySample, AgentError> {
        Ok(self.read().await?.days.get(&date).copied().unwrap_or_default())
    }
}

#[async_trait]
impl HealthSource for FileHealthSource {
    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .is_ok_and(|m| m.is_file())
    }

    /// Creates an empty export when none exists yet.
    async fn request_authorization(&self) -> Result<bool, AgentError> {
        if self.is_available().await {
            return Ok(true);
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.write(&HealthExport::default()).await?;
        Ok(true)
    }

    async fn fetch_steps(&self, date: NaiveDate) -> Result<i64, AgentError> {
        Ok(self.sample(date).await?.steps)
    }

    async fn fetch_water(&self, date: NaiveDate) -> Result<f64, AgentError> {
        Ok(self.sample(date).await?.water_ml)
    }

    async fn save_water(&self, ml: f64, date: NaiveDate) -> Result<(), AgentError> {
        let _guard = self.write_lock.lock().await;
        let mut export = self.read().await?;
        export.days.entry(date).or_default().water_ml += ml;
        self.write(&export).await
    }
}
