//! Layered configuration: built-in defaults, then `config.toml` in the
//! working directory if present, then environment variables prefixed
//! `NOTE_` (e.g. `NOTE_SERVER__PORT`), mirroring the `config` crate's own
//! layering idiom. `DATA_DIR`, per spec §6, is read directly (not
//! `NOTE_`-prefixed) because the spec names it literally.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub server: ServerSettings,
    /// `{term: [synonyms]}` for the search index's analyzer, per spec §4.7.
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("data_dir", "./data")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("NOTE").separator("__"));

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Ok(data_dir) = std::env::var("DATA_DIR") {
            settings.data_dir = PathBuf::from(data_dir);
        }

        Ok(settings)
    }

    pub fn content_store_root(&self) -> PathBuf {
        self.data_dir.join("note")
    }

    pub fn metadata_store_path(&self) -> PathBuf {
        self.data_dir.join("db").join("notes.db")
    }

    pub fn search_index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}
