//! Configuration: YAML config + env var overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Known provider presets
const PROVIDER_PRESETS: &[(&str, Option<&str>)] = &[
    ("openai", Some("https://api.openai.com/v1")),
    ("openrouter", Some("https://openrouter.ai/api/v1")),
];

/// Provider-specific API key env vars (checked before OPENAI_API_KEY fallback)
const PROVIDER_KEY_ENV_VARS: &[(&str, &str)] = &[("openrouter", "OPENROUTER_API_KEY")];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// "openai" | "openrouter" | "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model that scores action alignment
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (set here or via env var)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for Chat Completions API (auto-set for known providers)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Timeout for every outbound HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Minimum alignment score for an action to pass
    #[serde(default = "default_alignment_threshold")]
    pub alignment_threshold: f64,

    /// Score used when the evaluator cannot be reached
    #[serde(default = "default_fallback_score")]
    pub fallback_score: f64,

    /// Decimal places kept in the lat,lon geohash
    #[serde(default = "default_gps_precision")]
    pub gps_precision: usize,

    /// Allowed drift between local and remote clock
    #[serde(default = "default_ntp_tolerance")]
    pub ntp_tolerance_seconds: i64,

    #[serde(default = "default_geo_url")]
    pub geo_url: String,

    #[serde(default = "default_time_url")]
    pub time_url: String,

    /// Kernel action history (JSON array)
    #[serde(default = "default_memory_file")]
    pub memory_file: PathBuf,

    /// Sealed clause document
    #[serde(default = "default_contract_file")]
    pub contract_file: PathBuf,

    /// Optional external codex; the built-in letters are used when unset
    #[serde(default)]
    pub codex_file: Option<PathBuf>,

    #[serde(default = "default_analytics_file")]
    pub analytics_file: PathBuf,

    /// Encrypted vault storage
    #[serde(default = "default_storage_file")]
    pub storage_file: PathBuf,

    /// Raw 32-byte vault master key
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// PBKDF2 rounds for newly registered passwords
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    #[serde(default = "default_app_version")]
    pub app_version: String,

    #[serde(default = "default_release_api")]
    pub release_api: String,

    #[serde(default = "default_mqtt_broker")]
    pub mqtt_broker: String,

    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    #[serde(default = "default_kill_switch_topic")]
    pub kill_switch_topic: String,

    /// Hardware kill-switch pin
    #[serde(default = "default_gpio_pin")]
    pub gpio_pin: u8,

    #[serde(default = "default_dialogue_rounds")]
    pub dialogue_rounds: u32,

    /// Pause range between dialogue utterances, in milliseconds
    #[serde(default = "default_dialogue_pause_min")]
    pub dialogue_pause_min_ms: u64,
    #[serde(default = "default_dialogue_pause_max")]
    pub dialogue_pause_max_ms: u64,

    /// Resolved project root (set at load time, not serialized from YAML)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "deepseek/deepseek-r1".into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_alignment_threshold() -> f64 {
    0.95
}
fn default_fallback_score() -> f64 {
    0.95
}
fn default_gps_precision() -> usize {
    4
}
fn default_ntp_tolerance() -> i64 {
    60
}
fn default_geo_url() -> String {
    "https://ipapi.co/json".into()
}
fn default_time_url() -> String {
    "https://worldtimeapi.org/api/ip".into()
}
fn default_memory_file() -> PathBuf {
    PathBuf::from("memory.json")
}
fn default_contract_file() -> PathBuf {
    PathBuf::from("EternalLock.sol_lock")
}
fn default_analytics_file() -> PathBuf {
    PathBuf::from("analytics.json")
}
fn default_storage_file() -> PathBuf {
    PathBuf::from("storage.enc")
}
fn default_key_file() -> PathBuf {
    PathBuf::from("app_key.bin")
}
fn default_kdf_iterations() -> u32 {
    390_000
}
fn default_app_version() -> String {
    "1.0.0".into()
}
fn default_release_api() -> String {
    "https://api.github.com/repos/unknown/RA7-AGI-3.0/releases/latest".into()
}
fn default_mqtt_broker() -> String {
    "localhost".into()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_kill_switch_topic() -> String {
    "ra7/commands/AGI_HALT".into()
}
fn default_gpio_pin() -> u8 {
    21
}
fn default_dialogue_rounds() -> u32 {
    3
}
fn default_dialogue_pause_min() -> u64 {
    500
}
fn default_dialogue_pause_max() -> u64 {
    1500
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    /// `config_path` is the path to config.yaml.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

        // Resolve project root from config file location
        let parent = config_path.parent().unwrap_or(Path::new("."));
        config.project_root = parent
            .canonicalize()
            .unwrap_or_else(|_| parent.to_path_buf());

        config.finish()?;
        Ok(config)
    }

    /// Load `config_path` if it exists, otherwise start from defaults.
    /// Env var overrides apply either way.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.is_file() {
            return Self::load(config_path);
        }
        let mut config = Config {
            project_root: config_path
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf(),
            ..Config::default()
        };
        config.finish()?;
        Ok(config)
    }

    fn finish(&mut self) -> Result<()> {
        self.apply_env_overrides();

        if self.base_url.is_none() {
            self.base_url = PROVIDER_PRESETS
                .iter()
                .find(|(p, _)| *p == self.provider)
                .and_then(|(_, url)| url.map(String::from));
        }

        // Validation
        if self.provider == "custom" && self.base_url.is_none() {
            anyhow::bail!(
                "Provider 'custom' requires base_url in config.yaml or RA7_BASE_URL env var"
            );
        }
        if self.dialogue_pause_min_ms > self.dialogue_pause_max_ms {
            anyhow::bail!(
                "dialogue_pause_min_ms ({}) exceeds dialogue_pause_max_ms ({})",
                self.dialogue_pause_min_ms,
                self.dialogue_pause_max_ms
            );
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = std::env::var("RA7_PROVIDER") {
            self.provider = p;
        }

        if let Ok(url) = std::env::var("RA7_BASE_URL") {
            self.base_url = Some(url);
        }

        // API key: provider-specific env var > OPENAI_API_KEY > config
        let provider_key_var = PROVIDER_KEY_ENV_VARS
            .iter()
            .find(|(p, _)| *p == self.provider)
            .map(|(_, var)| *var);

        if let Some(var) = provider_key_var {
            if let Ok(key) = std::env::var(var) {
                self.api_key = Some(key);
            }
        }
        if self.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.api_key = Some(key);
            }
        }

        if let Ok(m) = std::env::var("RA7_MODEL") {
            self.model = m;
        }

        if let Ok(f) = std::env::var("RA7_ANALYTICS_FILE") {
            self.analytics_file = PathBuf::from(f);
        }

        if let Ok(b) = std::env::var("RA7_MQTT_BROKER") {
            self.mqtt_broker = b;
        }
    }

    /// Resolve a configured file path against the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            request_timeout_seconds: default_request_timeout(),
            alignment_threshold: default_alignment_threshold(),
            fallback_score: default_fallback_score(),
            gps_precision: default_gps_precision(),
            ntp_tolerance_seconds: default_ntp_tolerance(),
            geo_url: default_geo_url(),
            time_url: default_time_url(),
            memory_file: default_memory_file(),
            contract_file: default_contract_file(),
            codex_file: None,
            analytics_file: default_analytics_file(),
            storage_file: default_storage_file(),
            key_file: default_key_file(),
            kdf_iterations: default_kdf_iterations(),
            app_version: default_app_version(),
            release_api: default_release_api(),
            mqtt_broker: default_mqtt_broker(),
            mqtt_port: default_mqtt_port(),
            kill_switch_topic: default_kill_switch_topic(),
            gpio_pin: default_gpio_pin(),
            dialogue_rounds: default_dialogue_rounds(),
            dialogue_pause_min_ms: default_dialogue_pause_min(),
            dialogue_pause_max_ms: default_dialogue_pause_max(),
            project_root: PathBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "provider: openrouter").unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.provider, "openrouter");
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://openrouter.ai/api/v1")
        );
        assert_eq!(config.alignment_threshold, 0.95);
        assert_eq!(config.gps_precision, 4);
        assert_eq!(config.ntp_tolerance_seconds, 60);
        assert_eq!(config.kdf_iterations, 390_000);
        assert_eq!(config.kill_switch_topic, "ra7/commands/AGI_HALT");
        assert_eq!(config.contract_file, PathBuf::from("EternalLock.sol_lock"));
    }

    #[test]
    fn test_load_config_custom_values() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "provider: custom\nmodel: llama3\nbase_url: http://localhost:11434/v1\ndialogue_rounds: 5\ngps_precision: 2"
        )
        .unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.provider, "custom");
        assert_eq!(config.model, "llama3");
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.dialogue_rounds, 5);
        assert_eq!(config.gps_precision, 2);
    }

    #[test]
    fn test_custom_without_base_url_fails() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "provider: custom\nmodel: llama3").unwrap();

        let result = Config::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_pause_range_fails() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "dialogue_pause_min_ms: 900\ndialogue_pause_max_ms: 100").unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.dialogue_rounds, 3);
    }

    #[test]
    fn test_resolve_path() {
        let config = Config {
            project_root: PathBuf::from("/srv/ra7"),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_path(Path::new("memory.json")),
            PathBuf::from("/srv/ra7/memory.json")
        );
        assert_eq!(
            config.resolve_path(Path::new("/tmp/x.json")),
            PathBuf::from("/tmp/x.json")
        );
    }
}
