//! Parsing and validation of `vigil.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`], and resolves per-engine [`FileSelection`]s that decide
//! which files an engine analyzes. Configuration problems surface as
//! [`ConfigError`] before any worker process is spawned.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod selection;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use selection::FileSelection;
pub use types::*;
