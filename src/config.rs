use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::baseline::ColumnRef;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    #[serde(default = "default_baseline_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Position of the tracked feature, in both the baseline table and the
    /// pushed feature vector.
    #[serde(default = "default_column_index")]
    pub column_index: usize,
    /// Looks the baseline column up by header instead of by position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_disk_mount")]
    pub disk_mount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub baseline_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub endpoint: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/sidecar-monitor/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.baseline_path {
            self.baseline.path = path;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(endpoint) = overrides.endpoint {
            self.client.endpoint = endpoint;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_baseline_path(&self) -> PathBuf {
        expand_tilde(&self.baseline.path)
    }

    pub fn drift_column(&self) -> ColumnRef {
        match &self.drift.column_name {
            Some(name) => ColumnRef::Name(name.clone()),
            None => ColumnRef::Index(self.drift.column_index),
        }
    }

    pub fn sampler_interval(&self) -> Duration {
        Duration::from_secs(self.sampler.interval_secs.max(1))
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client.timeout_ms.max(1))
    }

    pub fn default_template() -> String {
        let template = r#"[server]
host = "0.0.0.0"
port = 8000

[baseline]
# Header row required; every cell numeric. BASELINE_PATH overrides.
path = "data/baseline_data.csv"

[drift]
# Same position in the baseline table and in pushed feature vectors.
column_index = 1
# column_name = "loan_amount"

[sampler]
interval_secs = 5
disk_mount = "/"

[client]
endpoint = "http://127.0.0.1:8000/track"
timeout_ms = 500
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            path: default_baseline_path(),
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            column_index: default_column_index(),
            column_name: None,
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            disk_mount: default_disk_mount(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_baseline_path() -> String {
    "data/baseline_data.csv".to_string()
}

fn default_column_index() -> usize {
    1
}

fn default_interval_secs() -> u64 {
    5
}

fn default_disk_mount() -> String {
    "/".to_string()
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000/track".to_string()
}

fn default_timeout_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::baseline::ColumnRef;
    use crate::config::{Config, ConfigOverrides};

    #[test]
    fn template_parses_to_defaults() {
        let parsed = Config::from_toml(&Config::default_template()).expect("template parses");
        let defaults = Config::default();
        assert_eq!(parsed.server.port, defaults.server.port);
        assert_eq!(parsed.baseline.path, defaults.baseline.path);
        assert_eq!(parsed.drift_column(), ColumnRef::Index(1));
        assert_eq!(parsed.sampler_interval(), Duration::from_secs(5));
        assert_eq!(parsed.client_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed = Config::from_toml(
            r#"
[drift]
column_name = "loan_amount"

[sampler]
interval_secs = 0
"#,
        )
        .expect("partial config");
        assert_eq!(
            parsed.drift_column(),
            ColumnRef::Name("loan_amount".to_string())
        );
        assert_eq!(parsed.sampler_interval(), Duration::from_secs(1));
        assert_eq!(parsed.server.host, "0.0.0.0");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            baseline_path: Some("/srv/baseline.csv".to_string()),
            port: Some(9100),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.resolved_baseline_path().to_str(), Some("/srv/baseline.csv"));
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config::load(Some(&dir.path().join("absent.toml"))).expect("defaults");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn writes_loadable_template() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/config.toml");
        Config::write_template(&path).expect("write template");
        let config = Config::load(Some(&path)).expect("load template");
        assert_eq!(config.drift.column_index, 1);
    }
}
