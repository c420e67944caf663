//! Configuration management module
//!
//! Responsible for loading process settings from the environment and the model catalog from file

pub mod file;
pub mod settings;

pub use file::{AppConfig, EndpointConfig, ModelEntry, BUILTIN_CATALOG};
pub use settings::Settings;
