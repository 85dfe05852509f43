//! Handles settings for the application. Configuration is read from
//! `settings.toml` (optional) and overridden by `LEDGER__*` environment
//! variables, e.g. `LEDGER__SERVER__PORT=8080`.
//!
//! See `settings.example.toml` for every key.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EngineSettings {
    pub max_retries: u32,
    /// Deadline of one transactional attempt; unset means none.
    pub tx_timeout_ms: Option<u64>,
    pub event_capacity: usize,
}

impl EngineSettings {
    pub fn tx_timeout(&self) -> Option<Duration> {
        self.tx_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: EngineSettings,
    pub server: Server,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("database.sqlite", "ledger.db")?
            .set_default("engine.max_retries", i64::from(engine::DEFAULT_MAX_RETRIES))?
            .set_default("engine.event_capacity", engine::DEFAULT_EVENT_CAPACITY as i64)?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
