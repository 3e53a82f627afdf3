//! Layered loading of [`AssayConfig`].

use std::env;
use std::fs;
use std::path::Path;

use crate::config::AssayConfig;
use crate::error::ConfigError;

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use assayer_core::ConfigLoader;
///
/// # fn main() -> Result<(), assayer_core::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("assayer.toml")?
///     .with_env_prefix("ASSAYER")
///     .load()?;
/// assayer_core::config::install(config);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: AssayConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: AssayConfig::default(),
            env_prefix: None,
        }
    }

    /// Load configuration from a file.
    ///
    /// The format (TOML or JSON) is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// or does not parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        self.config = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::invalid_value(
                    "file",
                    format!("unsupported configuration file format: {}", path.display()),
                ))
            }
        };

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TomlError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use assayer_core::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_toml("port = 7000\nbase_path = \"/api\"")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.port, 7000);
    /// assert_eq!(config.base_uri, "http://localhost");
    /// ```
    pub fn with_toml(mut self, content: &str) -> Result<Self, ConfigError> {
        self.config = toml::from_str(content)?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__KEY`, e.g. `ASSAYER__PORT=7000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply environment overrides, validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable does not parse or the
    /// result fails validation.
    pub fn load(self) -> Result<AssayConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable does not parse.
    pub fn load_unvalidated(mut self) -> Result<AssayConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }
        Ok(self.config)
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(name) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };

        match name {
            "BASE_URI" => self.config.base_uri = value.to_string(),
            "PORT" => {
                self.config.port = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected port number"))?;
            }
            "BASE_PATH" => self.config.base_path = value.to_string(),
            "ROOT_PATH" => self.config.root_path = value.to_string(),
            "URL_ENCODING_ENABLED" => {
                self.config.url_encoding_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "LOG_IF_VALIDATION_FAILS" => {
                self.config.log_if_validation_fails = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            _ => tracing::debug!(var = key, "ignoring unknown configuration variable"),
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, AssayConfig::default());
    }

    #[test]
    fn test_with_toml_keeps_unset_defaults() {
        let config = ConfigLoader::new()
            .with_toml(
                r#"
                base_uri = "http://127.0.0.1"
                root_path = "data"

                [default_headers]
                X-Api-Key = "secret"
                "#,
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.base_uri, "http://127.0.0.1");
        assert_eq!(config.root_path, "data");
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_headers.get("X-Api-Key").unwrap(), "secret");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = ConfigLoader::new().with_toml("colour = \"blue\"");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_with_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "port = 9000").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_with_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"base_path": "/v1", "log_if_validation_fails": true}}"#).unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.base_path, "/v1");
        assert!(config.log_if_validation_fails);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/assayer.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));

        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/assayer.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new().with_toml("port = 0").unwrap().load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let config = ConfigLoader::new()
            .with_toml("port = 0")
            .unwrap()
            .load_unvalidated()
            .unwrap();
        assert_eq!(config.port, 0);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    // Environment overrides are exercised through apply_env_var; mutating the
    // process environment would race with parallel tests.

    #[test]
    fn test_apply_env_var() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__BASE_URI", "http://10.0.0.1", "TEST").unwrap();
        loader.apply_env_var("TEST__PORT", "7000", "TEST").unwrap();
        loader.apply_env_var("TEST__BASE_PATH", "/api", "TEST").unwrap();
        loader.apply_env_var("TEST__URL_ENCODING_ENABLED", "no", "TEST").unwrap();
        loader.apply_env_var("TEST__UNKNOWN", "x", "TEST").unwrap();

        assert_eq!(loader.config.base_uri, "http://10.0.0.1");
        assert_eq!(loader.config.port, 7000);
        assert_eq!(loader.config.base_path, "/api");
        assert!(!loader.config.url_encoding_enabled);
    }

    #[test]
    fn test_apply_env_var_invalid() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__PORT", "not-a-port", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }
}
