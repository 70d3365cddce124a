//! Configuration loader with environment variable expansion

use super::{Config, ConfigError};
use lazy_static::lazy_static;
use regex_lite::Regex;
use std::path::Path;

lazy_static! {
    // ${VAR} or ${VAR:-default}
    static ref ENV_VAR: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("valid env var pattern");
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR_NAME}` and `${VAR_NAME:-default}`.
    ///
    /// A variable that is unset and has no default keeps its placeholder.
    fn expand_env_vars(content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut last_match = 0;

        for cap in ENV_VAR.captures_iter(content) {
            let Some(full_match) = cap.get(0) else {
                continue;
            };
            result.push_str(&content[last_match..full_match.start()]);

            let value = match std::env::var(&cap[1]) {
                Ok(val) => val,
                Err(_) => match cap.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => full_match.as_str().to_string(),
                },
            };
            result.push_str(&value);
            last_match = full_match.end();
        }

        result.push_str(&content[last_match..]);
        result
    }
}
