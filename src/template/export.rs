//! Serialise compiled templates back into their JSON document form

use serde_json::{json, Map, Value};

use crate::core::types::{TextRef, FALSE_TRUE_ENUM_SET};

use super::database::TemplateDatabase;
use super::record::{AttributeDescriptor, RangeSpec, SubcomponentDescriptor, TemplateRecord, UnitsSpec};

impl TemplateDatabase {
    /// Build a `{ "Version", "Template": [...] }` document from every
    /// registered template, ordered by handle.
    pub fn export_document(&self) -> Value {
        let mut entries: Vec<(&str, &TemplateRecord)> = self
            .registered()
            .filter_map(|(name, handle)| self.template(handle).ok().map(|r| (name, r)))
            .collect();
        entries.sort_by_key(|(_, record)| record.handle);

        let templates: Vec<Value> = entries
            .into_iter()
            .map(|(name, record)| export_template(name, record))
            .collect();

        let mut document = Map::new();
        if let Some(version) = self.version() {
            document.insert("Version".to_string(), json!(version));
        }
        document.insert("Template".to_string(), Value::Array(templates));
        Value::Object(document)
    }
}

fn export_template(name: &str, record: &TemplateRecord) -> Value {
    let mut obj = Map::new();
    obj.insert("-ID".into(), json!(record.id.as_deref().unwrap_or(name)));
    obj.insert("-type".into(), json!(record.template_type));
    obj.insert("-subtype".into(), json!(record.sub_type));
    obj.insert(
        "-presentValueAttributeId".into(),
        json!(record.present_value_attr),
    );
    for (key, field) in [
        ("-extends", &record.parent),
        ("-dictionary", &record.dictionary),
        ("-name", &record.name),
        ("-description", &record.description),
    ] {
        if let Some(text) = field {
            obj.insert(key.into(), json!(text));
        }
    }

    let mut attributes: Vec<&AttributeDescriptor> = record.attributes().collect();
    attributes.sort_by_key(|a| a.id);
    if !attributes.is_empty() {
        let properties: Vec<Value> = attributes.into_iter().map(export_attribute).collect();
        obj.insert("-PropertyList".into(), json!({ "-Property": properties }));
    }

    let mut subcomponents: Vec<&SubcomponentDescriptor> = record.subcomponents().collect();
    subcomponents.sort_by(|a, b| a.name.cmp(&b.name));
    if !subcomponents.is_empty() {
        let components: Vec<Value> = subcomponents
            .into_iter()
            .map(export_subcomponent)
            .collect();
        obj.insert(
            "-SubComponentList".into(),
            json!({ "-SubComponent": components }),
        );
    }

    Value::Object(obj)
}

fn text(reference: TextRef) -> Value {
    json!({ "-setId": reference.set_id, "-value": reference.value })
}

fn flag(set: bool) -> u8 {
    u8::from(set)
}

fn export_attribute(attr: &AttributeDescriptor) -> Value {
    let mut obj = Map::new();
    obj.insert("-ID".into(), json!(attr.id));
    obj.insert("-Required".into(), json!(flag(attr.required)));
    obj.insert("-DataType".into(), json!(attr.data_type));
    if attr.enum_set != FALSE_TRUE_ENUM_SET {
        obj.insert("-StringsetId".into(), json!(attr.enum_set));
    }
    if let Some(source) = attr.enum_set_redirect {
        obj.insert("-StringsetProperty".into(), json!(source));
    }
    obj.insert("-WritableFlag".into(), json!(flag(attr.writable)));
    obj.insert("-PriorityFlag".into(), json!(flag(attr.priority)));
    obj.insert("-MaxStringLength".into(), json!(attr.max_string_length));
    obj.insert("-IPDisplayPrecision".into(), json!(attr.ip_display_precision));
    obj.insert("-SIDisplayPrecision".into(), json!(attr.si_display_precision));
    obj.insert("-Name".into(), text(attr.name));
    obj.insert("-Description".into(), text(attr.description));
    if let Some(units) = &attr.ip_units {
        obj.insert("-IPUnits".into(), export_units(units, "-IPUnitsProperty"));
    }
    if let Some(units) = &attr.si_units {
        obj.insert("-SIUnits".into(), export_units(units, "-SIUnitsProperty"));
    }
    if let Some(measurement) = attr.measurement_type {
        obj.insert("-MeasurementType".into(), text(measurement));
    }
    if let Some(range) = &attr.ip_range {
        obj.insert("-IPRange".into(), export_range(range));
    }
    if let Some(range) = &attr.si_range {
        obj.insert("-SIRange".into(), export_range(range));
    }
    Value::Object(obj)
}

fn export_units(units: &UnitsSpec, redirect_key: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("-setId".into(), json!(units.unit.set_id));
    obj.insert("-value".into(), json!(units.unit.value));
    if let Some(source) = units.redirect {
        obj.insert(redirect_key.into(), json!(source));
    }
    Value::Object(obj)
}

fn export_range(range: &RangeSpec) -> Value {
    let mut obj = Map::new();
    obj.insert("-minvalue".into(), json!(range.min));
    obj.insert("-maxvalue".into(), json!(range.max));
    if let Some(source) = range.min_redirect {
        obj.insert("-minProperty".into(), json!(source));
    }
    if let Some(source) = range.max_redirect {
        obj.insert("-maxProperty".into(), json!(source));
    }
    Value::Object(obj)
}

fn export_subcomponent(sub: &SubcomponentDescriptor) -> Value {
    let mut obj = Map::new();
    obj.insert("-Name".into(), json!(sub.name));
    obj.insert("-Required".into(), json!(flag(sub.required)));
    if let Some(label) = sub.label {
        obj.insert("-label".into(), text(label));
    }
    if let Some(template_id) = &sub.template_id {
        obj.insert("-TemplateID".into(), json!(template_id));
    }
    Value::Object(obj)
}
