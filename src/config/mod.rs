//! Configuration module for querygen.
//!
//! Handles the `querygen.toml` settings file.

mod settings;

pub use settings::{GeneratorSettings, Settings, SettingsError};
