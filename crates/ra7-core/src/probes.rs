//! Environment probes: IP geolocation and remote clock check.
//! Both log and degrade instead of failing.

use anyhow::{Context, Result};
use tracing::error;

use crate::config::Config;
use crate::providers::build_client;

/// Geohash used when the location cannot be determined.
pub fn unknown_geohash(precision: usize) -> String {
    format!("{:.*},{:.*}", precision, 0.0, precision, 0.0)
}

pub fn format_geohash(lat: f64, lon: f64, precision: usize) -> String {
    format!("{:.*},{:.*}", precision, lat, precision, lon)
}

async fn fetch_json(config: &Config, url: &str) -> Result<serde_json::Value> {
    let client = build_client(config)?;
    let response = client
        .get(url)
        .send()
        .await
        .context("HTTP request failed")?
        .error_for_status()?;
    response.json().await.context("Failed to parse response")
}

fn geohash_from(data: &serde_json::Value, precision: usize) -> Option<String> {
    let lat = data.get("latitude")?.as_f64()?;
    let lon = data.get("longitude")?.as_f64()?;
    Some(format_geohash(lat, lon, precision))
}

/// Approximate device location as `lat,lon`.
pub async fn gps_hash(config: &Config) -> String {
    let precision = config.gps_precision;
    match fetch_json(config, &config.geo_url).await {
        Ok(data) => geohash_from(&data, precision).unwrap_or_else(|| {
            error!("GPS error: 'latitude' or 'longitude' not in response.");
            unknown_geohash(precision)
        }),
        Err(e) => {
            error!("GPS error: {:#}", e);
            unknown_geohash(precision)
        }
    }
}

/// Whether `remote` unix time is within `tolerance` seconds of `local`.
/// A negative tolerance accepts nothing.
pub fn within_tolerance(remote: i64, local: i64, tolerance: i64) -> bool {
    u64::try_from(tolerance).is_ok_and(|t| remote.abs_diff(local) <= t)
}

/// Compare the local clock against the remote time API.
pub async fn clock_ok(config: &Config) -> bool {
    match fetch_json(config, &config.time_url).await {
        Ok(data) => match data.get("unixtime").and_then(|v| v.as_i64()) {
            Some(remote) => within_tolerance(
                remote,
                chrono::Utc::now().timestamp(),
                config.ntp_tolerance_seconds,
            ),
            None => {
                error!("NTP error: 'unixtime' not in response.");
                false
            }
        },
        Err(e) => {
            error!("NTP error: {:#}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline() -> Config {
        Config {
            geo_url: "http://127.0.0.1:9/json".into(),
            time_url: "http://127.0.0.1:9/api/ip".into(),
            request_timeout_seconds: 2,
            ..Config::default()
        }
    }

    #[test]
    fn test_geohash_formatting() {
        assert_eq!(format_geohash(40.712776, -74.005974, 4), "40.7128,-74.0060");
        assert_eq!(unknown_geohash(4), "0.0000,0.0000");
        assert_eq!(unknown_geohash(2), "0.00,0.00");
    }

    #[test]
    fn test_geohash_from_response() {
        let data = json!({"latitude": 48.8566, "longitude": 2.3522, "city": "Paris"});
        assert_eq!(geohash_from(&data, 4).as_deref(), Some("48.8566,2.3522"));
        assert_eq!(geohash_from(&json!({"latitude": 1.0}), 4), None);
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(1_000, 1_060, 60));
        assert!(within_tolerance(1_060, 1_000, 60));
        assert!(!within_tolerance(1_000, 1_061, 60));
    }

    #[test]
    fn test_within_tolerance_extreme_values() {
        let now = 1_700_000_000;
        assert!(!within_tolerance(i64::MIN, now, 60));
        assert!(!within_tolerance(i64::MAX, now, 60));
        assert!(!within_tolerance(i64::MIN, i64::MAX, i64::MAX));
        assert!(within_tolerance(i64::MAX, i64::MAX, 0));
        assert!(!within_tolerance(now, now, -1));
    }

    #[tokio::test]
    async fn test_offline_probes_degrade() {
        let config = offline();
        assert_eq!(gps_hash(&config).await, "0.0000,0.0000");
        assert!(!clock_ok(&config).await);
    }
}
