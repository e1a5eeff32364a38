//! CLI utilities for facewatch.
//!
//! Loads the YAML configuration consumed by the `facewatch` command.

pub mod config;
pub mod paths;

pub use config::{load_config, Config, NotifyConfig, DEFAULT_CONFIG_FILE};
pub use paths::expand_home;
