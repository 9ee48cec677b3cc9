//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and overridden by `LEDGER__*` environment
//! variables (e.g. `LEDGER__APP__LEVEL=debug`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    /// Report drifted balances of every owner before running the command.
    pub verify_on_start: bool,
    /// Rewrite drifted balances of every owner before running the command.
    pub repair_on_start: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: Ledger,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("settings")
    }

    fn from_file(name: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("database.sqlite", "ledger.db")?
            .set_default("ledger.verify_on_start", false)?
            .set_default("ledger.repair_on_start", false)?
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
