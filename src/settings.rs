//! Runtime settings, layered: built-in defaults, then an optional `xcat.toml`
//! (or the file named by `XCAT_CONFIG`), then `XCAT_` environment variables
//! with `__` between nested keys, e.g. `XCAT_STORE__PATH=catalog.db`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use std::path::PathBuf;

use crate::error::Result;
use crate::facade::{SourcePriority, WriteModePolicy};
use crate::persist::PersistenceMode;

pub const DEFAULT_CONFIG_FILE: &str = "xcat.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite file holding the catalog. Without one the store lives in memory.
    pub path: Option<String>,
}

impl StoreSettings {
    pub fn persistence(&self) -> PersistenceMode {
        match &self.path {
            Some(path) => PersistenceMode::File(path.clone()),
            None => PersistenceMode::InMemory,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifySettings {
    pub source_priority: SourcePriority,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub write_mode: WriteModePolicy,
    pub log_filter: String,
    pub unify: UnifySettings,
    /// Statements file run at startup.
    pub bootstrap: Option<PathBuf>,
    pub output: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            write_mode: WriteModePolicy::default(),
            log_filter: "info".into(),
            unify: UnifySettings::default(),
            bootstrap: None,
            output: OutputFormat::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let file = std::env::var("XCAT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::load_from(&file)
    }

    pub fn load_from(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix("XCAT").separator("__").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
