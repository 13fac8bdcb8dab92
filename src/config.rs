//! Optional TOML configuration. Every key has a default, so an empty file or
//! no file at all gives the stock behavior.
//!
//! ```toml
//! [pubchem]
//! base_url = "https://pubchem.ncbi.nlm.nih.gov/rest/pug"
//! timeout_secs = 20
//!
//! [server]
//! bind = "127.0.0.1:8501"
//!
//! [panel]
//! sub_width = 550
//! sub_height = 450
//! ```

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pubchem: PubChemConfig,
    pub server: ServerConfig,
    pub panel: PanelConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PubChemConfig {
    /// root of the PUG REST API, without a trailing slash
    pub base_url: String,

    /// whole-request timeout for a single lookup
    pub timeout_secs: u64,
}

impl Default for PubChemConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug".to_owned(),
            timeout_secs: 20,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_owned(),
        }
    }
}

/// cell size for the panels written by the batch driver
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub sub_width: u32,
    pub sub_height: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            sub_width: 550,
            sub_height: 450,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&s)
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// load `path` if given, otherwise the defaults
    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
