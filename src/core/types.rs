//! Core type definitions used throughout the crate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored where the source left a 16-bit enumeration unset
pub const NONE_FFFF: u16 = 0xFFFF;

/// Enumeration set assumed for attributes that do not name one (false/true)
pub const FALSE_TRUE_ENUM_SET: u16 = 2;

/// Engineering unit used when a units block is present but names no unit
pub const NO_UNITS: u16 = 95;

/// Numeric attribute identifier within a template
pub type AttributeId = u16;

/// Handle of a compiled template, assigned sequentially from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateHandle(pub u16);

/// Handle of a menu group inside one view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupHandle(pub u16);

/// Identifier of a top-level view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u16);

/// Runtime handle of an external point, as produced by the reference binder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    /// Handle recorded when a reference could not be bound
    pub const UNRESOLVED: ObjectHandle = ObjectHandle(u32::MAX);

    pub fn is_resolved(&self) -> bool {
        *self != Self::UNRESOLVED
    }
}

impl fmt::Display for TemplateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template #{}", self.0)
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group #{}", self.0)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view #{}", self.0)
    }
}

/// Localized text reference: an enumeration set and a member of that set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRef {
    pub set_id: u16,
    pub value: u16,
}

impl TextRef {
    pub fn new(set_id: u16, value: u16) -> Self {
        Self { set_id, value }
    }

    /// Both halves unset, as stored for an omitted short label
    pub fn none() -> Self {
        Self {
            set_id: NONE_FFFF,
            value: NONE_FFFF,
        }
    }

    pub fn is_none(&self) -> bool {
        self.set_id == NONE_FFFF && self.value == NONE_FFFF
    }
}
