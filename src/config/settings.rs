//! TOML-based configuration for querygen.
//!
//! Example configuration:
//! ```toml
//! [generator]
//! dialect = "eclipselink"
//! resolve_select_aliases = true
//! alias_prefix = "outer_"
//! registered_functions = ["ADD_DAYS", "date_diff"]
//! register_builtin_functions = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dialect::{Dialect, UnknownDialect};
use crate::functions::FunctionRegistry;
use crate::generator::GeneratorOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "QUERYGEN_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error(transparent)]
    UnknownDialect(#[from] UnknownDialect),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Rendering configuration.
    pub generator: GeneratorSettings,
}

/// The `[generator]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Target dialect name (hibernate, eclipselink, datanucleus, openjpa).
    pub dialect: String,

    /// Inline unqualified references to select aliases bound to paths.
    pub resolve_select_aliases: bool,

    /// Prefix for join aliases of the outermost query level.
    pub alias_prefix: Option<String>,

    /// Functions the provider has registered under their own names.
    pub registered_functions: Vec<String>,

    /// Also register the generator's own helper functions
    /// (`LIMIT`, `SET_UNION`, `COUNT_STAR`, ...).
    pub register_builtin_functions: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default().to_string(),
            resolve_select_aliases: true,
            alias_prefix: None,
            registered_functions: Vec::new(),
            register_builtin_functions: true,
        }
    }
}

impl GeneratorSettings {
    /// Get the dialect type.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        Ok(self.dialect.parse::<Dialect>()?)
    }

    pub fn to_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            resolve_select_aliases: self.resolve_select_aliases,
            alias_prefix: self.alias_prefix.clone(),
        }
    }

    /// The registered-function set these settings describe.
    pub fn function_registry(&self) -> FunctionRegistry {
        let mut registry = if self.register_builtin_functions {
            FunctionRegistry::with_builtins()
        } else {
            FunctionRegistry::new()
        };
        for name in &self.registered_functions {
            registry.register(name);
        }
        registry
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        // Reject unknown dialects at load time rather than at first render.
        settings.generator.dialect()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUERYGEN_CONFIG`
    /// 2. `./querygen.toml`
    /// 3. `~/.config/querygen/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("querygen.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("querygen").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[generator]
dialect = "eclipselink"
resolve_select_aliases = false
alias_prefix = "outer_"
registered_functions = ["ADD_DAYS"]
"#;

        let settings: Settings = toml::from_str(toml).unwrap();
        let generator = &settings.generator;

        assert_eq!(generator.dialect().unwrap(), Dialect::EclipseLink);
        assert!(!generator.resolve_select_aliases);
        assert!(generator.register_builtin_functions);

        let options = generator.to_options();
        assert_eq!(options.alias_prefix.as_deref(), Some("outer_"));

        let registry = generator.function_registry();
        assert!(registry.contains("add_days"));
        assert!(registry.contains("SET_UNION"));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.generator.dialect().unwrap(), Dialect::Hibernate);
        assert!(settings.generator.resolve_select_aliases);
        assert_eq!(settings.generator.to_options(), GeneratorOptions::default());
    }

    #[test]
    fn test_builtins_can_be_disabled() {
        let settings: Settings = toml::from_str(
            "[generator]\nregister_builtin_functions = false\nregistered_functions = [\"X\"]\n",
        )
        .unwrap();
        let registry = settings.generator.function_registry();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("LIMIT"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generator]\ndialect = \"openjpa\"").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.generator.dialect().unwrap(), Dialect::OpenJpa);
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generator]\ndialect = \"toplink\"").unwrap();

        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownDialect(_)));
        assert_eq!(err.to_string(), "Unknown dialect: toplink");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_file(dir.path().join("querygen.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::FileNotFound(_)));
    }
}
