//! Handles settings for the application.
//!
//! Values come from an optional `settings.toml` in the working directory,
//! overridden by `LEDGER__SECTION__KEY` environment variables.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    pub auth: Auth,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_token_ttl() -> i64 {
    24
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn optional_values_get_defaults() {
        let settings = parse(
            r#"
            [server]
            port = 3000
            database = "memory"

            [auth]
            jwt_secret = "s"
            "#,
        )
        .unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.server.request_timeout_secs, 30);
        assert_eq!(settings.auth.token_ttl_hours, 24);
        assert!(matches!(settings.server.database, Database::Memory));
    }

    #[test]
    fn sqlite_database_takes_a_path() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            bind = "0.0.0.0"
            port = 8080
            database = { sqlite = "ledger.db" }

            [auth]
            jwt_secret = "s"
            token_ttl_hours = 2
            "#,
        )
        .unwrap();
        assert!(matches!(settings.server.database, Database::Sqlite(ref p) if p == "ledger.db"));
        assert_eq!(settings.server.bind.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = parse(
            r#"
            [server]
            port = 3000
            database = "memory"
            "#,
        );
        assert!(err.is_err());
    }
}
