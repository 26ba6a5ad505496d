//! Equipment template compiler
//!
//! A template is a named schema for one kind of equipment object: its
//! attributes (keyed by numeric id) and its nested subcomponents (keyed by
//! name). Templates are compiled once from JSON, registered in a
//! [`TemplateDatabase`], and read back many times afterwards.

pub mod database;
pub mod export;
pub mod parse;
pub mod record;

pub use database::{LoadSummary, TemplateDatabase};
pub use parse::compile_template;
pub use record::*;
