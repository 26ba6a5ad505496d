pub mod config;
pub mod error;
pub mod json;
pub mod logging;
pub mod types;

pub use config::ModelConfig;
pub use error::{CollaboratorError, Entity, ModelError, Result};
pub use types::*;
