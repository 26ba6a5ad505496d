//! Compiled template records

use serde::{Deserialize, Serialize};

use crate::core::error::CollaboratorError;
use crate::core::types::{AttributeId, ObjectHandle, TemplateHandle, TextRef};
use crate::hashtbl::HashTable;

/// Kind of value the attribute reader is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    Enum,
    Real,
}

/// Value returned by the attribute reader
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LiveValue {
    Enum(u16),
    Real(f64),
}

/// Reads the current value of an attribute on a live equipment object
pub trait AttributeReader {
    fn read_attribute(
        &self,
        object: ObjectHandle,
        attribute: AttributeId,
        expected: DataKind,
    ) -> Result<LiveValue, CollaboratorError>;
}

/// The object whose attributes supply redirected values
#[derive(Clone, Copy)]
pub struct LiveContext<'a> {
    pub object: ObjectHandle,
    pub reader: &'a dyn AttributeReader,
}

impl<'a> LiveContext<'a> {
    pub fn new(object: ObjectHandle, reader: &'a dyn AttributeReader) -> Self {
        Self { object, reader }
    }

    fn read_enum(&self, source: AttributeId) -> Option<u16> {
        match self.reader.read_attribute(self.object, source, DataKind::Enum) {
            Ok(LiveValue::Enum(v)) => Some(v),
            Ok(other) => {
                tracing::debug!("attribute {} returned {:?}, expected an enum", source, other);
                None
            }
            Err(e) => {
                tracing::debug!("redirected read of attribute {} failed: {}", source, e);
                None
            }
        }
    }

    fn read_real(&self, source: AttributeId) -> Option<f64> {
        match self.reader.read_attribute(self.object, source, DataKind::Real) {
            Ok(LiveValue::Real(v)) => Some(v),
            Ok(other) => {
                tracing::debug!("attribute {} returned {:?}, expected a real", source, other);
                None
            }
            Err(e) => {
                tracing::debug!("redirected read of attribute {} failed: {}", source, e);
                None
            }
        }
    }
}

/// A units block: the authored unit plus an optional live source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitsSpec {
    pub unit: TextRef,
    pub redirect: Option<AttributeId>,
}

/// A numeric range; each bound may be redirected independently
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub min_redirect: Option<AttributeId>,
    pub max_redirect: Option<AttributeId>,
}

/// Describes one attribute of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub id: AttributeId,
    pub required: bool,
    pub data_type: u8,
    pub enum_set: u16,
    pub enum_set_redirect: Option<AttributeId>,
    pub writable: bool,
    pub priority: bool,
    pub max_string_length: u8,
    pub ip_display_precision: u16,
    pub si_display_precision: u16,
    pub name: TextRef,
    pub description: TextRef,
    pub ip_units: Option<UnitsSpec>,
    pub si_units: Option<UnitsSpec>,
    pub measurement_type: Option<TextRef>,
    pub ip_range: Option<RangeSpec>,
    pub si_range: Option<RangeSpec>,
    /// Set when any field names a redirect source
    pub has_redirected_values: bool,
}

impl AttributeDescriptor {
    /// Copy of this descriptor with every redirected field re-read from `live`.
    ///
    /// A failed read leaves that field at its authored value. `self` is
    /// never modified, so a shared descriptor can serve many readers.
    pub fn with_live_values(&self, live: &LiveContext<'_>) -> AttributeDescriptor {
        let mut resolved = self.clone();
        if !self.has_redirected_values {
            return resolved;
        }

        if let Some(v) = self.enum_set_redirect.and_then(|src| live.read_enum(src)) {
            resolved.enum_set = v;
        }

        for units in [&mut resolved.ip_units, &mut resolved.si_units]
            .into_iter()
            .flatten()
        {
            if let Some(v) = units.redirect.and_then(|src| live.read_enum(src)) {
                units.unit.value = v;
            }
        }

        for range in [&mut resolved.ip_range, &mut resolved.si_range]
            .into_iter()
            .flatten()
        {
            if let Some(v) = range.min_redirect.and_then(|src| live.read_real(src)) {
                range.min = v;
            }
            if let Some(v) = range.max_redirect.and_then(|src| live.read_real(src)) {
                range.max = v;
            }
        }

        resolved
    }
}

/// A named nested template reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcomponentDescriptor {
    pub name: String,
    pub required: bool,
    pub label: Option<TextRef>,
    pub template_id: Option<String>,
}

/// A compiled template
#[derive(Debug)]
pub struct TemplateRecord {
    pub handle: TemplateHandle,
    pub template_type: u16,
    pub sub_type: u16,
    pub present_value_attr: AttributeId,
    pub parent: Option<String>,
    pub dictionary: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub(crate) attributes: HashTable<AttributeDescriptor>,
    pub(crate) subcomponents: HashTable<SubcomponentDescriptor>,
}

impl TemplateRecord {
    pub fn attribute(&self, id: AttributeId) -> Option<&AttributeDescriptor> {
        self.attributes.get(&id)
    }

    pub fn subcomponent(&self, name: &str) -> Option<&SubcomponentDescriptor> {
        self.subcomponents.get(name)
    }

    /// Attributes in table order
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    /// Subcomponents in table order
    pub fn subcomponents(&self) -> impl Iterator<Item = &SubcomponentDescriptor> {
        self.subcomponents.values()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn subcomponent_count(&self) -> usize {
        self.subcomponents.len()
    }

    /// The attribute table itself, for identity checks
    pub fn attribute_table(&self) -> &HashTable<AttributeDescriptor> {
        &self.attributes
    }
}
