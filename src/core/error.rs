use crate::core::types::{AttributeId, GroupHandle, TemplateHandle, ViewId};
use crate::hashtbl::HashError;
use thiserror::Error;

/// The kind of record a lookup failed to find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    TemplateName(String),
    Template(TemplateHandle),
    Attribute(TemplateHandle, AttributeId),
    Subcomponent(TemplateHandle, String),
    View(ViewId),
    Group(ViewId, GroupHandle),
    /// No view document has been compiled for the instance
    ViewDatabase,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::TemplateName(name) => write!(f, "template '{}'", name),
            Entity::Template(handle) => write!(f, "{}", handle),
            Entity::Attribute(handle, attr) => write!(f, "attribute {} of {}", attr, handle),
            Entity::Subcomponent(handle, name) => {
                write!(f, "subcomponent '{}' of {}", name, handle)
            }
            Entity::View(view) => write!(f, "{}", view),
            Entity::Group(view, group) => write!(f, "{} in {}", group, view),
            Entity::ViewDatabase => write!(f, "view database"),
        }
    }
}

/// Opaque failure reported by an external collaborator
/// (attribute reader, reference binder, document source)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name}: {message}")]
pub struct CollaboratorError {
    pub source_name: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(source_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            source_name,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Hash table error: {0}")]
    Table(#[from] HashError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Duplicate attribute {attribute} in template '{template}'")]
    DuplicateAttribute {
        template: String,
        attribute: AttributeId,
    },

    #[error("Not found: {0}")]
    NotFound(Entity),

    #[error("External collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl ModelError {
    pub(crate) fn missing(what: &str) -> Self {
        ModelError::Parse(format!("missing required field '{}'", what))
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
