//! Equipment Model - compiles JSON equipment templates and menu views
//! into handle-addressable records

pub mod core;
pub mod hashtbl;
pub mod model;
pub mod source;
pub mod template;
pub mod view;

pub use crate::core::{ModelConfig, ModelError, Result};
pub use model::EquipmentModel;
pub use source::{DocumentSource, FileSource};
