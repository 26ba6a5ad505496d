//! Where template and view documents come from

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::core::error::{CollaboratorError, ModelError, Result};
use crate::core::ModelConfig;

/// Supplies the parsed JSON documents a model is compiled from
pub trait DocumentSource {
    fn template_document(&self) -> Result<Value>;
    fn view_document(&self) -> Result<Value>;
}

/// Reads plain JSON documents from the configured data model directory
pub struct FileSource {
    template_path: PathBuf,
    view_path: PathBuf,
}

impl FileSource {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            template_path: config.template_path(),
            view_path: config.view_path(),
        }
    }

    fn read(path: &Path) -> Result<Value> {
        if path.extension().is_some_and(|ext| ext == "jz") {
            return Err(CollaboratorError::new(
                "file source",
                format!("{} is compressed; decompression is not supported", path.display()),
            )
            .into());
        }

        tracing::debug!("reading {}", path.display());
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(ModelError::from)
    }
}

impl DocumentSource for FileSource {
    fn template_document(&self) -> Result<Value> {
        Self::read(&self.template_path)
    }

    fn view_document(&self) -> Result<Value> {
        Self::read(&self.view_path)
    }
}
