//! Usage analytics: daily event counters and revenue, kept in a JSON file.

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsData {
    /// date (YYYY-MM-DD) -> event -> count
    #[serde(default)]
    pub daily: BTreeMap<String, BTreeMap<String, u64>>,
    #[serde(default)]
    pub revenue: f64,
}

pub struct Analytics {
    path: PathBuf,
}

impl Analytics {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<AnalyticsData> {
        if !self.path.is_file() {
            return Ok(AnalyticsData::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse analytics: {}", self.path.display()))
    }

    fn save(&self, data: &AnalyticsData) -> Result<()> {
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write analytics: {}", self.path.display()))
    }

    /// Count one occurrence of `event` today.
    pub fn log_event(&self, event: &str) -> Result<()> {
        let today = chrono::Local::now().date_naive().to_string();
        let mut data = self.load()?;
        *data
            .daily
            .entry(today)
            .or_default()
            .entry(event.to_string())
            .or_insert(0) += 1;
        debug!("analytics event {}", event);
        self.save(&data)
    }

    /// Add `amount` to total revenue, rounded to cents.
    pub fn log_revenue(&self, amount: f64) -> Result<()> {
        let mut data = self.load()?;
        data.revenue = ((data.revenue + amount) * 100.0).round() / 100.0;
        self.save(&data)
    }
}

/// Short URL-safe referral code (12 chars).
pub fn generate_referral_code() -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(rand::random::<[u8; 9]>())
}
