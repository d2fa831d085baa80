use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "development";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Runtime mode the application is running in.
///
/// Besides picking the config overlay, the mode decides which database the
/// service talks to: `Test` runs against the dedicated test database.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Parse the value of `BOOKSHELF_ENV`.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected development/test/production",
                other
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let raw_environment =
            std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let environment = Environment::parse(&raw_environment)?;

        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::from_dir(&config_dir, environment)
    }

    /// Build settings from `base.toml`, `{environment}.toml` and
    /// `BOOKSHELF__*` variables. Missing files are skipped.
    pub fn from_dir(config_dir: &std::path::Path, environment: Environment) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment.as_str()));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;
        settings.environment = environment;

        Ok(settings)
    }

    /// Connection string for the database selected by the current environment.
    pub fn database_url(&self) -> String {
        self.database.connection_url(self.environment)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    /// Zero disables the request timeout.
    #[serde(default)]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Explicit connection string; takes precedence over `directory`/`name`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "DatabaseSettings::default_directory")]
    pub directory: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_test_name")]
    pub test_name: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_directory() -> String {
        "data".to_string()
    }

    fn default_name() -> String {
        "books".to_string()
    }

    fn default_test_name() -> String {
        "books-test".to_string()
    }

    fn default_max_connections() -> u32 {
        1
    }

    /// Database name for the given runtime mode.
    pub fn database_name(&self, environment: Environment) -> &str {
        match environment {
            Environment::Test => &self.test_name,
            Environment::Development | Environment::Production => &self.name,
        }
    }

    pub fn connection_url(&self, environment: Environment) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "sqlite://{}/{}.db",
                self.directory.trim_end_matches('/'),
                self.database_name(environment)
            ),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            directory: Self::default_directory(),
            name: Self::default_name(),
            test_name: Self::default_test_name(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fallback filter directive when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_development() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Development);
    }

    #[test]
    fn test_environment_selects_test_database() {
        let database = DatabaseSettings::default();
        assert_eq!(database.database_name(Environment::Test), "books-test");
        assert_eq!(database.database_name(Environment::Production), "books");
        assert_eq!(
            database.connection_url(Environment::Test),
            "sqlite://data/books-test.db"
        );
    }

    #[test]
    fn explicit_url_wins() {
        let database = DatabaseSettings {
            url: Some("sqlite::memory:".to_string()),
            ..DatabaseSettings::default()
        };
        assert_eq!(
            database.connection_url(Environment::Production),
            "sqlite::memory:"
        );
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = Environment::parse("staging").unwrap_err();
        assert!(err.to_string().contains("development/test/production"));
    }

    #[test]
    fn missing_config_dir_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("bookshelf-missing-config-dir");
        let settings = Settings::from_dir(&dir, Environment::Test).unwrap();
        assert_eq!(settings.environment, Environment::Test);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.max_connections, 1);
    }
}
