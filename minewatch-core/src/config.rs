use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MinewatchConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fixtures: FixturesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Which durable mirror backs the chat transcript.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Whole-file JSON array, rewritten on every append.
    #[default]
    Snapshot,
    /// One JSON record per line, appended and fsynced.
    Journal,
    /// No durable mirror.
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub chat_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Snapshot,
            chat_path: "data/chat.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FixturesConfig {
    pub data_dir: String,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl MinewatchConfig {
    /// Load from a TOML file (optional) overlaid with `MINEWATCH__SECTION__KEY`
    /// environment variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MINEWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = MinewatchConfig::load("/nonexistent/minewatch-config").unwrap();
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.storage.backend, StorageBackend::Snapshot);
        assert_eq!(config.storage.chat_path, "data/chat.json");
        assert_eq!(config.fixtures.data_dir, "data");
    }

    #[test]
    fn test_file_overrides_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[http]
host = "0.0.0.0"
port = 8080

[storage]
backend = "journal"
chat_path = "/var/lib/minewatch/chat.jsonl"
"#
        )
        .unwrap();

        let config = MinewatchConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Journal);
        assert_eq!(config.storage.chat_path, "/var/lib/minewatch/chat.jsonl");
        // untouched sections keep their defaults
        assert_eq!(config.service.log_level, "info");
    }
}
