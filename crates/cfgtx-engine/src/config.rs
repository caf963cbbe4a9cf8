//! Engine configuration
//!
//! ```toml
//! [logging]
//! profile = "production"
//!
//! [datastore]
//! backend = "netconf"
//! default_content = "all"
//! ```
//!
//! Every section and key is optional.

use std::fs;
use std::path::Path;

use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::logging_facility::{self, Profile};
use serde::Deserialize;

use crate::commands::read::Content;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub datastore: DatastoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatastoreConfig {
    pub backend: BackendKind,
    /// Content used by reads that do not name one
    pub default_content: Content,
}

/// Backend selected by the `[datastore]` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Broker,
    Netconf,
    None,
}

impl EngineConfig {
    /// # Errors
    ///
    /// `Configuration` when the text is not valid TOML or names unknown keys
    /// or values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| TxError::Configuration {
            message: format!("invalid engine configuration: {}", e),
        })
    }

    /// # Errors
    ///
    /// `Configuration` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| TxError::Configuration {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            backend = ?config.datastore.backend,
            "engine configuration loaded"
        );
        Ok(config)
    }

    /// Initialize logging with the configured profile
    pub fn init_logging(&self) {
        logging_facility::init(self.logging.profile);
    }
}
