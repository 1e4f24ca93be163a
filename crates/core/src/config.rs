use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Remote rule backend used by the HTTP repository. Unset `base_url` means
/// the deployment prices from the local database only.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub backend_base_url: Option<String>,
    pub log_level: Option<String>,
    pub cache_ttl_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://craftquote.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            backend: BackendConfig { base_url: None, api_token: None, timeout_secs: 10 },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            cache: CacheConfig { enabled: true, ttl_secs: 60 },
            pricing: PricingConfig { currency: "VND".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    backend: Option<BackendPatch>,
    server: Option<ServerPatch>,
    cache: Option<CachePatch>,
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    api_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    enabled: Option<bool>,
    ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<String>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let maybe_path = resolve_config_path(options.config_path.as_deref());
        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            return Err(ConfigError::MissingConfigFile(
                options.config_path.unwrap_or_else(|| PathBuf::from("craftquote.toml")),
            ));
        }

        config.apply_env()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(backend) = patch.backend {
            if backend.base_url.is_some() {
                self.backend.base_url = backend.base_url;
            }
            if let Some(api_token) = backend.api_token {
                self.backend.api_token = Some(api_token.into());
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
        }
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }
        if let Some(cache) = patch.cache {
            if let Some(enabled) = cache.enabled {
                self.cache.enabled = enabled;
            }
            if let Some(ttl_secs) = cache.ttl_secs {
                self.cache.ttl_secs = ttl_secs;
            }
        }
        if let Some(pricing) = patch.pricing {
            if let Some(currency) = pricing.currency {
                self.pricing.currency = currency;
            }
        }
        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format.parse()?;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = read_env("CRAFTQUOTE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(value) = read_env("CRAFTQUOTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("CRAFTQUOTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CRAFTQUOTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("CRAFTQUOTE_DATABASE_TIMEOUT_SECS", &value)?;
        }
        if let Some(base_url) = read_env("CRAFTQUOTE_BACKEND_BASE_URL") {
            self.backend.base_url = Some(base_url);
        }
        if let Some(token) = read_env("CRAFTQUOTE_BACKEND_API_TOKEN") {
            self.backend.api_token = Some(token.into());
        }
        if let Some(value) = read_env("CRAFTQUOTE_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_env("CRAFTQUOTE_BACKEND_TIMEOUT_SECS", &value)?;
        }
        if let Some(bind_address) = read_env("CRAFTQUOTE_BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }
        if let Some(value) = read_env("CRAFTQUOTE_PORT") {
            self.server.port = parse_env("CRAFTQUOTE_PORT", &value)?;
        }
        if let Some(value) = read_env("CRAFTQUOTE_CACHE_ENABLED") {
            self.cache.enabled = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "CRAFTQUOTE_CACHE_ENABLED".to_string(),
                        value,
                    })
                }
            };
        }
        if let Some(value) = read_env("CRAFTQUOTE_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_env("CRAFTQUOTE_CACHE_TTL_SECS", &value)?;
        }
        if let Some(currency) = read_env("CRAFTQUOTE_CURRENCY") {
            self.pricing.currency = currency;
        }
        if let Some(level) = read_env("CRAFTQUOTE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = read_env("CRAFTQUOTE_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(backend_base_url) = overrides.backend_base_url {
            self.backend.base_url = Some(backend_base_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(cache_ttl_secs) = overrides.cache_ttl_secs {
            self.cache.ttl_secs = cache_ttl_secs;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.database.timeout_secs == 0 || self.backend.timeout_secs == 0 {
            return Err(ConfigError::Validation("timeouts must be at least 1 second".to_string()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must not be 0".to_string()));
        }
        if self.pricing.currency.trim().is_empty() {
            return Err(ConfigError::Validation("pricing.currency must not be empty".to_string()));
        }
        let level = self.logging.level.trim().to_ascii_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::Validation(format!(
                "unsupported log level `{}`",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Human-readable dump for the `config` CLI command; secrets redacted.
    pub fn redacted_summary(&self) -> String {
        let token = match &self.backend.api_token {
            Some(token) => redact(token.expose_secret()),
            None => "(unset)".to_string(),
        };
        let base_url = self.backend.base_url.as_deref().unwrap_or("(unset)");
        format!(
            "database.url = {}\n\
             database.max_connections = {}\n\
             database.timeout_secs = {}\n\
             backend.base_url = {}\n\
             backend.api_token = {}\n\
             backend.timeout_secs = {}\n\
             server.bind_address = {}\n\
             server.port = {}\n\
             cache.enabled = {}\n\
             cache.ttl_secs = {}\n\
             pricing.currency = {}\n\
             logging.level = {}\n\
             logging.format = {:?}",
            self.database.url,
            self.database.max_connections,
            self.database.timeout_secs,
            base_url,
            token,
            self.backend.timeout_secs,
            self.server.bind_address,
            self.server.port,
            self.cache.enabled,
            self.cache.ttl_secs,
            self.pricing.currency,
            self.logging.level,
            self.logging.format,
        )
    }
}

fn redact(token: &str) -> String {
    if token.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &token[..4])
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = read_env("CRAFTQUOTE_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from("craftquote.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Mutex, OnceLock};

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_craftquote_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with("CRAFTQUOTE_") {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_validate() {
        let _guard = env_lock().lock().expect("env lock");
        clear_craftquote_env();

        let config = AppConfig::load(LoadOptions::default()).expect("default config");
        assert_eq!(config.database.url, "sqlite://craftquote.db");
        assert_eq!(config.pricing.currency, "VND");
        assert!(config.cache.enabled);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let _guard = env_lock().lock().expect("env lock");
        clear_craftquote_env();

        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://custom.db\"\n\n[cache]\nttl_secs = 300\n\n[logging]\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load from file");

        assert_eq!(config.database.url, "sqlite://custom.db");
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn env_beats_file_and_overrides_beat_env() {
        let _guard = env_lock().lock().expect("env lock");
        clear_craftquote_env();

        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        writeln!(file, "[database]\nurl = \"sqlite://from-file.db\"\n").expect("write config");

        std::env::set_var("CRAFTQUOTE_DATABASE_URL", "sqlite://from-env.db");
        let from_env = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("env override");
        assert_eq!(from_env.database.url, "sqlite://from-env.db");

        let from_override = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-cli.db".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .expect("cli override");
        assert_eq!(from_override.database.url, "sqlite://from-cli.db");

        std::env::remove_var("CRAFTQUOTE_DATABASE_URL");
    }

    #[test]
    fn invalid_numeric_env_value_is_rejected() {
        let _guard = env_lock().lock().expect("env lock");
        clear_craftquote_env();

        std::env::set_var("CRAFTQUOTE_PORT", "not-a-port");
        let error = AppConfig::load(LoadOptions::default()).expect_err("bad port");
        assert!(matches!(error, ConfigError::InvalidEnvOverride { .. }));
        std::env::remove_var("CRAFTQUOTE_PORT");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_lock().lock().expect("env lock");
        clear_craftquote_env();

        let error = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/craftquote.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect_err("missing file");
        assert!(matches!(error, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn summary_redacts_api_token() {
        let _guard = env_lock().lock().expect("env lock");
        clear_craftquote_env();

        let mut config = AppConfig::default();
        config.backend.api_token = Some("cq-secret-token-value".to_string().into());

        let summary = config.redacted_summary();
        assert!(summary.contains("cq-s****"));
        assert!(!summary.contains("secret-token-value"));
    }
}
