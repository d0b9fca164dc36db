//! Pipeline configuration, loadable from a JSON file.
//!
//! ```json
//! {
//!   "case": "lower",
//!   "fallback": { "placeholder": [["n/a"]] }
//! }
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::transform::{DefaultContent, Lower, Reshape, Upper};
use crate::error::{BridgeError, Result};

/// Which case fold the transformer applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    #[default]
    Upper,
    Lower,
}

impl Case {
    pub fn reshape(self) -> Box<dyn Reshape> {
        match self {
            Case::Upper => Box::new(Upper),
            Case::Lower => Box::new(Lower),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub case: Case,
    /// Empty-load policy handed to the transformer.
    pub fallback: DefaultContent,
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| BridgeError::from_io(path, e))?;
        Self::from_json_str(&text).map_err(|e| BridgeError::Decode {
            path: path.to_path_buf(),
            message: format!("invalid pipeline config: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Table;
    use crate::data::transform::placeholder_table;

    #[test]
    fn empty_object_is_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config.case, Case::Upper);
        assert_eq!(
            config.fallback,
            DefaultContent::Placeholder(placeholder_table())
        );
    }

    #[test]
    fn parses_case_and_fallback() {
        let config =
            PipelineConfig::from_json_str(r#"{"case": "lower", "fallback": {"placeholder": [["n/a"]]}}"#)
                .unwrap();
        assert_eq!(config.case, Case::Lower);
        let expected: Table = [["n/a"]].into_iter().collect();
        assert_eq!(config.fallback, DefaultContent::Placeholder(expected));

        let config = PipelineConfig::from_json_str(r#"{"fallback": "fail"}"#).unwrap();
        assert_eq!(config.fallback, DefaultContent::Fail);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(PipelineConfig::from_json_str(r#"{"delimiter": ";"}"#).is_err());
    }

    #[test]
    fn missing_config_file_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = PipelineConfig::from_json_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BridgeError::ResourceNotFound { .. }));
    }

    #[test]
    fn case_maps_to_reshape() {
        assert_eq!(Case::Upper.reshape().reshape("aBc"), "ABC");
        assert_eq!(Case::Lower.reshape().reshape("aBc"), "abc");
    }
}
