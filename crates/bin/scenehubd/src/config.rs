//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `scenehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use scenehub_app::settings::EngineSettings;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Scene engine settings.
    pub engine: EngineConfig,
    /// Initial content of the virtual backend.
    pub seed: SeedConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Scene engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine instance; only scenes owned by it are loaded.
    pub instance: String,
    /// Coalescing window of consistency checks, in milliseconds.
    pub consistency_debounce_ms: u64,
    /// Above this many watched ids the engine subscribes to every state.
    pub coarse_subscription_threshold: usize,
}

/// Seed file configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// JSON document with scenes, categories, devices and states.
    pub path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `scenehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("scenehub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SCENEHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SCENEHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("SCENEHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("SCENEHUB_INSTANCE") {
            self.engine.instance = val;
        }
        if let Ok(val) = std::env::var("SCENEHUB_SEED") {
            self.seed.path = Some(val);
        }
        if let Ok(val) = std::env::var("SCENEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.engine.instance.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine instance must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Engine tunables derived from the `[engine]` section.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            instance: self.engine.instance.clone(),
            consistency_debounce: Duration::from_millis(self.engine.consistency_debounce_ms),
            coarse_subscription_threshold: self.engine.coarse_subscription_threshold,
            ..EngineSettings::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            instance: settings.instance,
            consistency_debounce_ms: 200,
            coarse_subscription_threshold: settings.coarse_subscription_threshold,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "scenehubd=info,scenehub_app=info,scenehub_adapter_virtual=info,tower_http=debug"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.engine.instance, "scenes.0");
        assert_eq!(config.engine.consistency_debounce_ms, 200);
        assert_eq!(config.engine.coarse_subscription_threshold, 200);
        assert_eq!(config.seed.path, None);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [engine]
            instance = 'scenes.1'
            consistency_debounce_ms = 500
            coarse_subscription_threshold = 50

            [seed]
            path = 'seed.json'

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.engine.instance, "scenes.1");
        assert_eq!(config.seed.path.as_deref(), Some("seed.json"));
        assert_eq!(config.logging.filter, "debug");

        let settings = config.engine_settings();
        assert_eq!(settings.instance, "scenes.1");
        assert_eq!(settings.consistency_debounce, Duration::from_millis(500));
        assert_eq!(settings.coarse_subscription_threshold, 50);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_blank_instance() {
        let mut config = Config::default();
        config.engine.instance = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_format_bind_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [engine]
            instance = 'scenes.2'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.instance, "scenes.2");
        assert_eq!(config.engine.consistency_debounce_ms, 200);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
