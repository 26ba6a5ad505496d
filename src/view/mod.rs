//! Menu views: compiled per equipment instance from a JSON view document

pub mod compile;
pub mod database;
pub mod resolve;
pub mod tree;

pub use compile::ViewCompiler;
pub use database::ViewDatabase;
pub use resolve::{ReferenceBinder, ReferenceCache};
pub use tree::*;
