//! Configuration management.
//!
//! Settings resolve in three layers: built-in defaults, an optional TOML
//! file, and `LECTERN_*` environment variables applied last.
//!
//! ```toml
//! db_path = "/var/lib/lectern/content.db"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [mail]
//! endpoint = "https://api.mailprovider.example/v1/messages"
//! from_address = "no-reply@lectern.example"
//!
//! [observability.logging]
//! format = "json"
//! level = "info"
//!
//! [observability.metrics]
//! enabled = true
//! port = 9090
//! ```

use crate::models::is_valid_email;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the mail provider API key by default.
pub const DEFAULT_MAIL_API_KEY_ENV: &str = "LECTERN_MAIL_API_KEY";

/// Main configuration for Lectern.
#[derive(Debug, Clone)]
pub struct LecternConfig {
    /// Path to the SQLite content database.
    pub db_path: PathBuf,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Outbound mail settings.
    pub mail: MailConfig,
    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Returns the bind address as `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Outbound mail configuration.
///
/// The provider API key is never stored in the file; the file names the
/// environment variable that holds it.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Mail provider endpoint URL.
    pub endpoint: String,
    /// Sender address for outbound mail.
    pub from_address: String,
    /// Environment variable holding the provider API key.
    pub api_key_env: String,
}

impl MailConfig {
    /// Reads the provider API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn api_key(&self) -> crate::Result<SecretString> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| crate::Error::OperationFailed {
                operation: "read_mail_api_key".to_string(),
                cause: format!("environment variable {} is not set", self.api_key_env),
            })
    }

    fn validate(&self) -> crate::Result<()> {
        if !is_valid_email(&self.from_address) {
            return Err(crate::Error::InvalidInput(format!(
                "mail sender address '{}' is not a valid email address",
                self.from_address
            )));
        }
        Ok(())
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mailprovider.example/v1/messages".to_string(),
            from_address: "no-reply@lectern.example".to_string(),
            api_key_env: DEFAULT_MAIL_API_KEY_ENV.to_string(),
        }
    }
}

/// Observability section in config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ObservabilitySettings {
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    pub metrics: Option<MetricsSettings>,
}

/// Logging section in config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSettings {
    /// Log format: "json" or "pretty".
    pub format: Option<String>,
    /// Log level filter, e.g. "info" or "lectern=debug".
    pub level: Option<String>,
    /// Optional log file path.
    pub file: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsSettings {
    /// Whether metrics are enabled.
    pub enabled: Option<bool>,
    /// Port for the Prometheus exporter.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Database path.
    pub db_path: Option<String>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
    /// Mail section.
    pub mail: Option<ConfigFileMail>,
    /// Observability section.
    pub observability: Option<ObservabilitySettings>,
}

/// Server section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileServer {
    /// Bind address.
    pub host: Option<String>,
    /// Listen port.
    pub port: Option<u16>,
}

/// Mail section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMail {
    /// Provider endpoint URL.
    pub endpoint: Option<String>,
    /// Sender address.
    pub from_address: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
}

impl Default for LecternConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("lectern.db"),
            server: ServerConfig::default(),
            mail: MailConfig::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl LecternConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration using the standard resolution order.
    ///
    /// 1. The explicit `path` argument, when given.
    /// 2. The `LECTERN_CONFIG` environment variable, when set.
    /// 3. The platform config directory, falling back to defaults.
    ///
    /// Environment overrides are applied last in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or
    /// parsed. A missing file in the default locations is not an error.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = if let Some(path) = path {
            Self::load_from_file(path)?
        } else if let Some(env_path) = configured_path_from_env() {
            Self::load_from_file(&env_path)?
        } else {
            Self::load_default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {}", path.display(), e),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/lectern/` on macOS)
    /// 2. XDG config dir (`~/.config/lectern/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        // Check platform-specific config dir first
        let platform_config = base_dirs.config_dir().join("lectern").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/lectern/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("lectern")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `LecternConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(db_path) = file.db_path {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(server) = file.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
        }
        if let Some(mail) = file.mail {
            if let Some(endpoint) = mail.endpoint {
                config.mail.endpoint = endpoint;
            }
            if let Some(from_address) = mail.from_address {
                config.mail.from_address = from_address;
            }
            if let Some(api_key_env) = mail.api_key_env {
                config.mail.api_key_env = api_key_env;
            }
        }
        if let Some(observability) = file.observability {
            config.observability = observability;
        }

        config
    }

    /// Applies `LECTERN_*` environment overrides on top of loaded values.
    fn apply_env_overrides(&mut self) {
        if let Some(db_path) = parse_string_env("LECTERN_DB_PATH") {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(host) = parse_string_env("LECTERN_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("LECTERN_SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Some(endpoint) = parse_string_env("LECTERN_MAIL_ENDPOINT") {
            self.mail.endpoint = endpoint;
        }
        if let Some(from_address) = parse_string_env("LECTERN_MAIL_FROM") {
            self.mail.from_address = from_address;
        }
    }

    /// Checks the configuration for values that cannot work at runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the database path is empty or the mail sender
    /// address is not a valid email address.
    pub fn validate(&self) -> crate::Result<()> {
        if self.db_path.as_os_str().is_empty() {
            return Err(crate::Error::InvalidInput(
                "database path is empty".to_string(),
            ));
        }
        self.mail.validate()
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

fn configured_path_from_env() -> Option<PathBuf> {
    parse_string_env("LECTERN_CONFIG").map(PathBuf::from)
}

fn parse_string_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LecternConfig::default();
        assert_eq!(config.db_path, PathBuf::from("lectern.db"));
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.mail.api_key_env, DEFAULT_MAIL_API_KEY_ENV);
        assert!(config.observability.logging.is_none());
    }

    #[test]
    fn test_full_file_overrides_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            db_path = "/srv/lectern/content.db"

            [server]
            host = "0.0.0.0"
            port = 9000

            [mail]
            endpoint = "https://mail.example/send"
            from_address = "updates@lectern.example"
            api_key_env = "MAIL_KEY"

            [observability.logging]
            format = "json"
            level = "debug"

            [observability.metrics]
            enabled = true
            port = 9100
            "#,
        )
        .unwrap();

        let config = LecternConfig::from_config_file(file);
        assert_eq!(config.db_path, PathBuf::from("/srv/lectern/content.db"));
        assert_eq!(config.server.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.mail.endpoint, "https://mail.example/send");
        assert_eq!(config.mail.from_address, "updates@lectern.example");
        assert_eq!(config.mail.api_key_env, "MAIL_KEY");

        let logging = config.observability.logging.unwrap();
        assert_eq!(logging.format.as_deref(), Some("json"));
        assert_eq!(logging.level.as_deref(), Some("debug"));

        let metrics = config.observability.metrics.unwrap();
        assert_eq!(metrics.enabled, Some(true));
        assert_eq!(metrics.port, Some(9100));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 3001
            "#,
        )
        .unwrap();

        let config = LecternConfig::from_config_file(file);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.db_path, PathBuf::from("lectern.db"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(LecternConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sender() {
        let mut config = LecternConfig::default();
        config.mail.from_address = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_db_path() {
        let config = LecternConfig::default().with_db_path("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_missing_env_is_error() {
        let mail = MailConfig {
            api_key_env: "LECTERN_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..MailConfig::default()
        };
        assert!(mail.api_key().is_err());
    }
}
