//! cfgtx Engine - Orchestration layer
//!
//! Provides the strategy facade that runs data operations (read, put,
//! create, merge, delete, patch) against whichever backend is configured,
//! plus the TOML configuration that selects it.

pub mod commands;
pub mod config;

pub use commands::read::Content;
pub use commands::strategy::{Backends, DataStrategy};
pub use commands::write::PutResult;
pub use config::{BackendKind, DatastoreConfig, EngineConfig, LoggingConfig};
