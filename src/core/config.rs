//! Model configuration with documented table sizes
//!
//! The hash tables never resize, so every bucket count here is chosen for
//! the worst-case load the table is expected to see.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::error::Result;

/// Configuration for the template and view databases
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    // === TEMPLATE DATABASE ===
    /// Buckets in the template name -> handle table
    pub template_name_buckets: usize,

    /// Buckets in the handle -> template record table
    pub template_record_buckets: usize,

    /// Buckets in each template's attribute table (keyed by attribute id)
    pub attribute_buckets: usize,

    /// Buckets in each template's subcomponent table (keyed by name)
    pub subcomponent_buckets: usize,

    // === VIEW DATABASE ===
    /// Buckets in the view id -> view tree table
    pub view_buckets: usize,

    /// Buckets in each view's group handle table
    pub group_buckets: usize,

    /// Buckets in the per-instance reference resolution cache
    pub reference_cache_buckets: usize,

    /// Handle of every view's root group; synthetic handles count up from here
    pub root_group_handle: u16,

    /// Deepest group nesting a view may have, counting the root as 1
    pub max_view_depth: usize,

    // === DOCUMENT SOURCE ===
    /// Directory holding the data model documents
    pub data_model_path: PathBuf,

    /// Template document file name, relative to `data_model_path`
    pub template_file: String,

    /// View document file name, relative to `data_model_path`
    pub view_file: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            template_name_buckets: 1,
            template_record_buckets: 16,
            attribute_buckets: 8,
            subcomponent_buckets: 1,

            view_buckets: 1,
            group_buckets: 32,
            reference_cache_buckets: 64,
            root_group_handle: 1000,
            max_view_depth: 64,

            data_model_path: PathBuf::from("data"),
            template_file: "templates.json".to_string(),
            view_file: "views.json".to_string(),
        }
    }
}

impl ModelConfig {
    /// Parse a configuration from TOML text; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn template_path(&self) -> PathBuf {
        self.data_model_path.join(&self.template_file)
    }

    pub fn view_path(&self) -> PathBuf {
        self.data_model_path.join(&self.view_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.attribute_buckets, 8);
        assert_eq!(config.subcomponent_buckets, 1);
        assert_eq!(config.root_group_handle, 1000);
        assert_eq!(config.max_view_depth, 64);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ModelConfig::from_toml_str(
            r#"
group_buckets = 128
data_model_path = "/opt/model"
"#,
        )
        .unwrap();

        assert_eq!(config.group_buckets, 128);
        assert_eq!(config.reference_cache_buckets, 64);
        assert_eq!(config.template_path(), PathBuf::from("/opt/model/templates.json"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ModelConfig::from_toml_str("group_buckets = \"many\"").unwrap_err();
        assert!(matches!(err, crate::core::error::ModelError::Config(_)));
    }
}
