//! Configuration loading (§6.1).
//!
//! Modeled on the teacher's `core/proof.rs`, which loads a `ProofConfig`
//! via `toml::from_str`. DSS configuration is smaller — two keys — but
//! follows the same shape: a `serde`-derived struct with defaults, loaded
//! from a TOML document, overridable from the environment for deployments
//! that inject config without a file on disk.

use crate::error::Result;
use serde::Deserialize;

fn default_connect_string() -> String {
    "dbname=phobos host=localhost".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(rename = "dss.connect_string", default = "default_connect_string")]
    pub connect_string: String,

    #[serde(rename = "tape_model.supported_list", default)]
    pub tape_model_supported_list: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_string: default_connect_string(),
            tape_model_supported_list: String::new(),
        }
    }
}

impl Config {
    /// Parse a flat TOML document using the dotted keys from §6.1, e.g.:
    ///
    /// ```toml
    /// "dss.connect_string" = "dbname=phobos host=localhost"
    /// "tape_model.supported_list" = "LTO7,LTO8,LTO9"
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Start from defaults (or a parsed file) and overlay
    /// `DSS_CONNECT_STRING` / `DSS_TAPE_MODELS` environment variables.
    pub fn from_env_or_default() -> Self {
        let mut cfg = Config::default();
        if let Ok(v) = std::env::var("DSS_CONNECT_STRING") {
            cfg.connect_string = v;
        }
        if let Ok(v) = std::env::var("DSS_TAPE_MODELS") {
            cfg.tape_model_supported_list = v;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_connect_string_matches_spec() {
        assert_eq!(Config::default().connect_string, "dbname=phobos host=localhost");
    }

    #[test]
    fn from_toml_str_parses_dotted_keys() {
        let cfg = Config::from_toml_str(
            "\"dss.connect_string\" = \"dbname=test\"\n\"tape_model.supported_list\" = \"LTO8,LTO9\"\n",
        )
        .unwrap();
        assert_eq!(cfg.connect_string, "dbname=test");
        assert_eq!(cfg.tape_model_supported_list, "LTO8,LTO9");
    }

    #[test]
    fn env_overlay_wins_over_default() {
        unsafe {
            std::env::set_var("DSS_CONNECT_STRING", "dbname=overlaid");
        }
        let cfg = Config::from_env_or_default();
        assert_eq!(cfg.connect_string, "dbname=overlaid");
        unsafe {
            std::env::remove_var("DSS_CONNECT_STRING");
        }
    }
}
