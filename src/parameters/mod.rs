//! Generic key/value command bus.
//!
//! A small, frozen set of typed entry points (`set_bool`, `get_int`,
//! `set_object`, `set_parameters`, `set_profile`, ...) carries an open-ended
//! command vocabulary encoded as dot-namespaced keys and JSON values.

use serde_json::Value;

use crate::error::EngineError;
use crate::handle::{Release, StringHandle};

pub mod command;
pub mod facade;
pub mod keys;
pub mod store;

pub use command::{ObjectCommand, ParametersCommand};
pub use facade::RtcEngineParameters;
pub use store::ParameterStore;

/// Tagged parameter value as seen by callers.
///
/// Objects and arrays travel as serialized JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Number(f64),
    String(String),
    Object(String),
    Array(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::UInt(_) => "uint",
            ParameterValue::Number(_) => "number",
            ParameterValue::String(_) => "string",
            ParameterValue::Object(_) => "object",
            ParameterValue::Array(_) => "array",
        }
    }

    /// Convert to the JSON value stored on the bus.
    ///
    /// # Errors
    /// `InvalidArgument` for non-finite numbers, or object/array text that
    /// does not parse to the declared shape.
    pub fn into_json(self) -> Result<Value, EngineError> {
        match self {
            ParameterValue::Bool(value) => Ok(Value::Bool(value)),
            ParameterValue::Int(value) => Ok(Value::from(value)),
            ParameterValue::UInt(value) => Ok(Value::from(value)),
            ParameterValue::Number(value) => number_to_json(value),
            ParameterValue::String(value) => Ok(Value::String(value)),
            ParameterValue::Object(text) => parse_object(&text),
            ParameterValue::Array(text) => parse_array(&text),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::UInt(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

pub(crate) fn number_to_json(value: f64) -> Result<Value, EngineError> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| EngineError::invalid_argument(format!("{} is not a finite number", value)))
}

pub(crate) fn parse_object(text: &str) -> Result<Value, EngineError> {
    let value: Value = serde_json::from_str(text)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(EngineError::invalid_argument("expected a JSON object"))
    }
}

pub(crate) fn parse_array(text: &str) -> Result<Value, EngineError> {
    let value: Value = serde_json::from_str(text)?;
    if value.is_array() {
        Ok(value)
    } else {
        Err(EngineError::invalid_argument("expected a JSON array"))
    }
}

/// The parameter-bus capability (`CLOUDRTC_IID_RTC_ENGINE_PARAMETER`).
///
/// Getters fail with `NotFound` for unset keys and `TypeMismatch` when the
/// stored value cannot be read as the requested type.
pub trait ParameterBus: Release + Send {
    fn set_bool(&self, key: &str, value: bool) -> Result<(), EngineError>;
    fn get_bool(&self, key: &str) -> Result<bool, EngineError>;

    fn set_int(&self, key: &str, value: i32) -> Result<(), EngineError>;
    fn get_int(&self, key: &str) -> Result<i32, EngineError>;

    fn set_uint(&self, key: &str, value: u32) -> Result<(), EngineError>;
    fn get_uint(&self, key: &str) -> Result<u32, EngineError>;

    fn set_number(&self, key: &str, value: f64) -> Result<(), EngineError>;
    fn get_number(&self, key: &str) -> Result<f64, EngineError>;

    fn set_string(&self, key: &str, value: &str) -> Result<(), EngineError>;
    fn get_string(&self, key: &str) -> Result<StringHandle, EngineError>;

    /// Store a JSON object given as text under `key`.
    fn set_object(&self, key: &str, value: &str) -> Result<(), EngineError>;
    /// Raw JSON text of the object stored under `key`.
    fn get_object(&self, key: &str) -> Result<StringHandle, EngineError>;
    /// Raw JSON text of the array stored under `key`.
    fn get_array(&self, key: &str) -> Result<StringHandle, EngineError>;

    /// Bulk set from a JSON object. Later duplicates win; other keys are
    /// untouched. Entries are applied in key order, not document order.
    fn set_parameters(&self, parameters: &str) -> Result<(), EngineError>;

    /// Load a profile. `merge = true` overlays it, `merge = false` replaces
    /// the whole settings surface.
    fn set_profile(&self, profile: &str, merge: bool) -> Result<(), EngineError>;

    /// Typed set through the matching accessor.
    fn set_value(&self, key: &str, value: ParameterValue) -> Result<(), EngineError> {
        match value {
            ParameterValue::Bool(value) => self.set_bool(key, value),
            ParameterValue::Int(value) => self.set_int(key, value),
            ParameterValue::UInt(value) => self.set_uint(key, value),
            ParameterValue::Number(value) => self.set_number(key, value),
            ParameterValue::String(value) => self.set_string(key, &value),
            ParameterValue::Object(text) => self.set_object(key, &text),
            ParameterValue::Array(text) => {
                let array = parse_array(&text)?;
                self.set_parameters(&ParametersCommand::new().set(key, array).to_json())
            }
        }
    }
}
