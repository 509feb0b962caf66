//! Remote update check against the latest GitHub release.

use std::time::Duration;
use tracing::{debug, error};

use crate::config::Config;

const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest release tag, or "" if it cannot be fetched.
pub async fn fetch_latest_version(config: &Config) -> String {
    let result = async {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ra7/", env!("CARGO_PKG_VERSION")))
            .timeout(RELEASE_TIMEOUT)
            .build()?;
        let data: serde_json::Value = client
            .get(&config.release_api)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok::<_, reqwest::Error>(data)
    }
    .await;

    match result {
        Ok(data) => data
            .get("tag_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        Err(e) => {
            error!("Update check failed: {}", e);
            String::new()
        }
    }
}

/// Whether `latest` names a release different from `current`.
pub fn is_newer_tag(latest: &str, current: &str) -> bool {
    let latest = latest.trim().trim_start_matches('v');
    !latest.is_empty() && latest != current
}

pub async fn is_update_available(config: &Config) -> bool {
    let latest = fetch_latest_version(config).await;
    debug!("latest release {:?}, running {}", latest, config.app_version);
    is_newer_tag(&latest, &config.app_version)
}
