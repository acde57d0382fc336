//! Resolver configuration
//!
//! Read from a JSON file, for example:
//!
//! ```json
//! { "validateDefaults": true, "extensions": ["avsc", "avdl"] }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Result};

pub const SCHEMA_EXTENSION: &str = "avsc";
pub const PROTOCOL_EXTENSION: &str = "avpr";
pub const IDL_EXTENSION: &str = "avdl";

pub const UTF8_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Check field defaults against their schemas while parsing
    pub validate_defaults: bool,

    /// File extensions picked up when walking directories
    pub extensions: Vec<String>,

    /// Encoding of written schema files
    pub output_character_encoding: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            validate_defaults: false,
            extensions: vec![
                SCHEMA_EXTENSION.to_string(),
                PROTOCOL_EXTENSION.to_string(),
                IDL_EXTENSION.to_string(),
            ],
            output_character_encoding: UTF8_ENCODING.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.output_character_encoding.eq_ignore_ascii_case(UTF8_ENCODING)
            && !self.output_character_encoding.eq_ignore_ascii_case("UTF8")
        {
            return Err(Error::Config(format!(
                "Unsupported output character encoding: {}",
                self.output_character_encoding
            )));
        }
        if self.extensions.is_empty() {
            return Err(Error::Config("No file extensions configured".to_string()));
        }
        for ext in &self.extensions {
            if ![SCHEMA_EXTENSION, PROTOCOL_EXTENSION, IDL_EXTENSION].contains(&ext.as_str()) {
                return Err(Error::Config(format!("Unsupported file extension: {}", ext)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::from_json("{}").unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert!(!config.validate_defaults);
        assert_eq!(config.extensions, vec!["avsc", "avpr", "avdl"]);
    }

    #[test]
    fn test_camel_case_keys() {
        let config = ResolverConfig::from_json(
            r#"{"validateDefaults": true, "extensions": ["avdl"], "outputCharacterEncoding": "utf-8"}"#,
        )
        .unwrap();
        assert!(config.validate_defaults);
        assert_eq!(config.extensions, vec!["avdl"]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ResolverConfig::from_json(r#"{"outputCharacterEncoding": "Latin-1"}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ResolverConfig::from_json(r#"{"extensions": ["java"]}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ResolverConfig::from_json(r#"{"validate_defaults": true}"#),
            Err(Error::Config(_))
        ));
    }
}
