//! Field readers for loosely typed JSON objects
//!
//! Numeric fields are narrowed with `as`, so an out-of-range value wraps
//! instead of failing the compile. Non-integer values read as absent.

use serde_json::Value;

use crate::core::error::{ModelError, Result};
use crate::core::types::TextRef;

pub fn as_u16(value: &Value) -> Option<u16> {
    value.as_i64().map(|n| n as u16)
}

pub fn as_u8(value: &Value) -> Option<u8> {
    value.as_i64().map(|n| n as u8)
}

pub fn as_u32(value: &Value) -> Option<u32> {
    value.as_i64().map(|n| n as u32)
}

pub fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

pub fn u16_field(obj: &Value, key: &str) -> Option<u16> {
    obj.get(key).and_then(as_u16)
}

pub fn u8_field(obj: &Value, key: &str) -> Option<u8> {
    obj.get(key).and_then(as_u8)
}

pub fn u32_field(obj: &Value, key: &str) -> Option<u32> {
    obj.get(key).and_then(as_u32)
}

pub fn f64_field(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key).and_then(|v| v.as_f64())
}

pub fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

/// True only for a literal JSON `true`
pub fn is_true(obj: &Value, key: &str) -> bool {
    matches!(obj.get(key), Some(Value::Bool(true)))
}

pub fn require<'a>(obj: &'a Value, key: &str) -> Result<&'a Value> {
    obj.get(key).ok_or_else(|| ModelError::missing(key))
}

/// Read a `{set_key, value_key}` pair, leaving absent halves at zero
pub fn text_ref(obj: &Value, set_key: &str, value_key: &str) -> TextRef {
    TextRef {
        set_id: u16_field(obj, set_key).unwrap_or(0),
        value: u16_field(obj, value_key).unwrap_or(0),
    }
}
