//! JSON template -> [`TemplateRecord`]
//!
//! Keys are matched field by field against a fixed set; anything else is
//! ignored so newer documents still compile.

use serde_json::Value;

use crate::core::error::{ModelError, Result};
use crate::core::json::{
    as_string, as_u16, as_u8, f64_field, str_field, text_ref, u16_field, u8_field,
};
use crate::core::types::{TemplateHandle, TextRef, FALSE_TRUE_ENUM_SET, NO_UNITS};
use crate::core::ModelConfig;
use crate::hashtbl::{HashError, HashTable, KeyKind};

use super::record::{
    AttributeDescriptor, RangeSpec, SubcomponentDescriptor, TemplateRecord, UnitsSpec,
};

/// Compile one template object.
///
/// `name` is the registration name, used only for error reporting.
pub fn compile_template(
    name: &str,
    handle: TemplateHandle,
    json: &Value,
    config: &ModelConfig,
) -> Result<TemplateRecord> {
    let obj = json
        .as_object()
        .ok_or_else(|| ModelError::Parse(format!("template '{}' is not an object", name)))?;

    let mut record = TemplateRecord {
        handle,
        template_type: 0,
        sub_type: 0,
        present_value_attr: 0,
        parent: None,
        dictionary: None,
        id: None,
        name: None,
        description: None,
        attributes: HashTable::create(config.attribute_buckets, KeyKind::Integer)?,
        subcomponents: HashTable::create(config.subcomponent_buckets, KeyKind::ByteString)?,
    };

    for (key, value) in obj {
        match key.as_str() {
            "-type" => record.template_type = u16_or_zero(value),
            "-subtype" => record.sub_type = u16_or_zero(value),
            "-presentValueAttributeId" => record.present_value_attr = u16_or_zero(value),
            "-extends" => record.parent = as_string(value),
            "-dictionary" => record.dictionary = as_string(value),
            "-name" => record.name = as_string(value),
            "-description" => record.description = as_string(value),
            "-ID" => record.id = as_string(value),
            "-PropertyList" => {
                if let Some(Value::Array(properties)) = value.get("-Property") {
                    for property in properties {
                        let attribute = parse_attribute(property)?;
                        let id = attribute.id;
                        record.attributes.insert(&id, attribute).map_err(|e| match e {
                            HashError::DuplicateKey => ModelError::DuplicateAttribute {
                                template: name.to_string(),
                                attribute: id,
                            },
                            other => ModelError::Table(other),
                        })?;
                    }
                }
            }
            "-SubComponentList" => {
                if let Some(Value::Array(components)) = value.get("-SubComponent") {
                    for component in components {
                        let sub = parse_subcomponent(component)?;
                        let key = sub.name.clone();
                        record.subcomponents.insert(&key, sub)?;
                    }
                }
            }
            _ => {}
        }
    }

    tracing::debug!(
        "compiled template '{}' as {} ({} attributes, {} subcomponents)",
        name,
        handle,
        record.attributes.len(),
        record.subcomponents.len()
    );

    Ok(record)
}

fn u16_or_zero(value: &Value) -> u16 {
    as_u16(value).unwrap_or(0)
}

fn u8_or_zero(value: &Value) -> u8 {
    as_u8(value).unwrap_or(0)
}

fn as_flag(value: &Value) -> bool {
    u8_or_zero(value) != 0
}

fn parse_attribute(json: &Value) -> Result<AttributeDescriptor> {
    let obj = json
        .as_object()
        .ok_or_else(|| ModelError::Parse("property entry is not an object".to_string()))?;

    let mut attr = AttributeDescriptor {
        id: 0,
        required: false,
        data_type: 0,
        enum_set: FALSE_TRUE_ENUM_SET,
        enum_set_redirect: None,
        writable: false,
        priority: false,
        max_string_length: 0,
        ip_display_precision: 0,
        si_display_precision: 0,
        name: TextRef::default(),
        description: TextRef::default(),
        ip_units: None,
        si_units: None,
        measurement_type: None,
        ip_range: None,
        si_range: None,
        has_redirected_values: false,
    };

    for (key, value) in obj {
        match key.as_str() {
            "-ID" => attr.id = u16_or_zero(value),
            "-Required" => attr.required = as_flag(value),
            "-DataType" => attr.data_type = u8_or_zero(value),
            "-StringsetId" => attr.enum_set = u16_or_zero(value),
            "-StringsetProperty" => attr.enum_set_redirect = Some(u16_or_zero(value)),
            "-WritableFlag" => attr.writable = as_flag(value),
            "-PriorityFlag" => attr.priority = as_flag(value),
            "-MaxStringLength" => attr.max_string_length = u8_or_zero(value),
            "-IPDisplayPrecision" => attr.ip_display_precision = u16_or_zero(value),
            "-SIDisplayPrecision" => attr.si_display_precision = u16_or_zero(value),
            "-Name" => attr.name = text_ref(value, "-setId", "-value"),
            "-Description" => attr.description = text_ref(value, "-setId", "-value"),
            "-IPUnits" => attr.ip_units = Some(parse_units(value, "-IPUnitsProperty")),
            "-SIUnits" => attr.si_units = Some(parse_units(value, "-SIUnitsProperty")),
            "-MeasurementType" => {
                attr.measurement_type = Some(text_ref(value, "-setId", "-value"))
            }
            "-IPRange" => attr.ip_range = Some(parse_range(value)),
            "-SIRange" => attr.si_range = Some(parse_range(value)),
            _ => {}
        }
    }

    attr.has_redirected_values = attr.enum_set_redirect.is_some()
        || [&attr.ip_units, &attr.si_units]
            .into_iter()
            .flatten()
            .any(|u| u.redirect.is_some())
        || [&attr.ip_range, &attr.si_range]
            .into_iter()
            .flatten()
            .any(|r| r.min_redirect.is_some() || r.max_redirect.is_some());

    Ok(attr)
}

fn parse_units(value: &Value, redirect_key: &str) -> UnitsSpec {
    UnitsSpec {
        unit: TextRef {
            set_id: u16_field(value, "-setId").unwrap_or(0),
            value: u16_field(value, "-value").unwrap_or(NO_UNITS),
        },
        redirect: u16_field(value, redirect_key),
    }
}

fn parse_range(value: &Value) -> RangeSpec {
    RangeSpec {
        min: f64_field(value, "-minvalue").unwrap_or(0.0),
        max: f64_field(value, "-maxvalue").unwrap_or(0.0),
        min_redirect: u16_field(value, "-minProperty"),
        max_redirect: u16_field(value, "-maxProperty"),
    }
}

fn parse_subcomponent(json: &Value) -> Result<SubcomponentDescriptor> {
    let name = str_field(json, "-Name")
        .ok_or_else(|| ModelError::missing("-Name"))?
        .to_string();

    Ok(SubcomponentDescriptor {
        name,
        required: u8_field(json, "-Required").map_or(false, |v| v != 0),
        label: json.get("-label").map(|l| text_ref(l, "-setId", "-value")),
        template_id: str_field(json, "-TemplateID").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(json: &Value) -> Result<TemplateRecord> {
        compile_template("test", TemplateHandle(1), json, &ModelConfig::default())
    }

    #[test]
    fn test_header_fields() {
        let record = compile(&json!({
            "-type": 3,
            "-subtype": 12,
            "-presentValueAttributeId": 85,
            "-extends": "BaseEquipment",
            "-dictionary": "HVAC",
            "-name": "Air Handler",
            "-description": "Single duct AHU",
            "-ID": "AHU1",
            "-futureKey": { "ignored": true }
        }))
        .unwrap();

        assert_eq!(record.template_type, 3);
        assert_eq!(record.sub_type, 12);
        assert_eq!(record.present_value_attr, 85);
        assert_eq!(record.parent.as_deref(), Some("BaseEquipment"));
        assert_eq!(record.dictionary.as_deref(), Some("HVAC"));
        assert_eq!(record.id.as_deref(), Some("AHU1"));
        assert_eq!(record.attribute_count(), 0);
    }

    #[test]
    fn test_out_of_range_numbers_wrap() {
        let record = compile(&json!({
            "-type": 70000,
            "-subtype": "12",
            "-PropertyList": { "-Property": [ { "-ID": 2, "-DataType": 257, "-Required": 256 } ] }
        }))
        .unwrap();

        assert_eq!(record.template_type, 70000u32 as u16);
        assert_eq!(record.sub_type, 0);
        let attr = record.attribute(2).unwrap();
        assert_eq!(attr.data_type, 1);
        assert!(!attr.required);
    }

    #[test]
    fn test_attribute_defaults() {
        let record = compile(&json!({
            "-PropertyList": { "-Property": [ { "-ID": 7011 } ] }
        }))
        .unwrap();

        let attr = record.attribute(7011).unwrap();
        assert_eq!(attr.enum_set, FALSE_TRUE_ENUM_SET);
        assert!(!attr.has_redirected_values);
        assert!(attr.ip_units.is_none());
        assert!(attr.ip_range.is_none());
    }

    #[test]
    fn test_units_default_to_no_units() {
        let record = compile(&json!({
            "-PropertyList": { "-Property": [
                { "-ID": 1, "-IPUnits": { "-setId": 507 } }
            ] }
        }))
        .unwrap();

        let units = record.attribute(1).unwrap().ip_units.unwrap();
        assert_eq!(units.unit, TextRef::new(507, NO_UNITS));
        assert_eq!(units.redirect, None);
    }

    #[test]
    fn test_redirect_sources_set_flag() {
        let record = compile(&json!({
            "-PropertyList": { "-Property": [
                { "-ID": 1, "-SIRange": { "-minvalue": 0.0, "-maxvalue": 100.0, "-maxProperty": 9 } },
                { "-ID": 2, "-StringsetProperty": 4 },
                { "-ID": 3, "-SIRange": { "-minvalue": 1.5, "-maxvalue": 2.5 } }
            ] }
        }))
        .unwrap();

        let ranged = record.attribute(1).unwrap();
        assert!(ranged.has_redirected_values);
        assert_eq!(ranged.si_range.unwrap().max_redirect, Some(9));

        assert!(record.attribute(2).unwrap().has_redirected_values);
        assert!(!record.attribute(3).unwrap().has_redirected_values);
    }

    #[test]
    fn test_duplicate_attribute_aborts() {
        let err = compile(&json!({
            "-PropertyList": { "-Property": [ { "-ID": 5 }, { "-ID": 5 } ] }
        }))
        .unwrap_err();

        assert!(matches!(
            err,
            ModelError::DuplicateAttribute { attribute: 5, .. }
        ));
    }

    #[test]
    fn test_subcomponents() {
        let record = compile(&json!({
            "-SubComponentList": { "-SubComponent": [
                {
                    "-Name": "SupplyFan",
                    "-Required": 1,
                    "-label": { "-setId": 501, "-value": 17 },
                    "-TemplateID": "Fan"
                }
            ] }
        }))
        .unwrap();

        let fan = record.subcomponent("SupplyFan").unwrap();
        assert!(fan.required);
        assert_eq!(fan.label, Some(TextRef::new(501, 17)));
        assert_eq!(fan.template_id.as_deref(), Some("Fan"));
        assert!(record.subcomponent("ReturnFan").is_none());
    }

    #[test]
    fn test_nameless_subcomponent_aborts() {
        let err = compile(&json!({
            "-SubComponentList": { "-SubComponent": [ { "-Required": 1 } ] }
        }))
        .unwrap_err();

        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn test_non_object_template() {
        assert!(matches!(compile(&json!([1, 2])), Err(ModelError::Parse(_))));
    }
}
