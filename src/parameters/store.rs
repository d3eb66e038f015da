//! Backing map for the parameter bus.
//!
//! The store only validates and keeps values. Forwarding to the media
//! backend happens in the engine, which commits a value here once the
//! backend has accepted it.

use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::parameters::keys;

#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    values: Map<String, Value>,
    enforce_shapes: bool,
}

impl ParameterStore {
    pub fn new(enforce_shapes: bool) -> Self {
        Self {
            values: Map::new(),
            enforce_shapes,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Check that `value` may be stored under `key`.
    pub fn validate(&self, key: &str, value: &Value) -> Result<(), EngineError> {
        if key.trim().is_empty() {
            return Err(EngineError::invalid_argument("parameter key is empty"));
        }
        if self.enforce_shapes {
            keys::check_shape(key, value)?;
        }
        Ok(())
    }

    /// Validate every entry of a batch. Nothing is stored.
    pub fn validate_batch(&self, batch: &Map<String, Value>) -> Result<(), EngineError> {
        batch
            .iter()
            .try_for_each(|(key, value)| self.validate(key, value))
    }

    /// Store a value that has already been validated and accepted.
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.values.insert(key, value)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get(&self, key: &str) -> Result<&Value, EngineError> {
        self.values.get(key).ok_or_else(|| EngineError::NotFound {
            key: key.to_string(),
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, EngineError> {
        read_bool(key, self.get(key)?)
    }

    pub fn get_int(&self, key: &str) -> Result<i32, EngineError> {
        read_int(key, self.get(key)?)
    }

    pub fn get_uint(&self, key: &str) -> Result<u32, EngineError> {
        read_uint(key, self.get(key)?)
    }

    pub fn get_number(&self, key: &str) -> Result<f64, EngineError> {
        read_number(key, self.get(key)?)
    }

    pub fn get_string(&self, key: &str) -> Result<String, EngineError> {
        read_string(key, self.get(key)?)
    }

    /// Serialized JSON text of an object value.
    pub fn get_object(&self, key: &str) -> Result<String, EngineError> {
        read_object_text(key, self.get(key)?)
    }

    /// Serialized JSON text of an array value.
    pub fn get_array(&self, key: &str) -> Result<String, EngineError> {
        read_array_text(key, self.get(key)?)
    }

    /// Whole settings surface as a flat JSON object.
    pub fn to_json(&self) -> String {
        Value::Object(self.values.clone()).to_string()
    }

    /// Parse a bulk-set or profile document.
    ///
    /// The document must be a single JSON object. When a key repeats, the
    /// later occurrence wins.
    pub fn parse_batch(text: &str) -> Result<Map<String, Value>, EngineError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(map),
            other => Err(EngineError::invalid_argument(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

// Typed reads. A value is coercible when it fits the requested type
// exactly; integers must also fit the target range.

pub fn read_bool(key: &str, value: &Value) -> Result<bool, EngineError> {
    value.as_bool().ok_or_else(|| mismatch(key, "bool"))
}

pub fn read_int(key: &str, value: &Value) -> Result<i32, EngineError> {
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| mismatch(key, "int"))
}

pub fn read_uint(key: &str, value: &Value) -> Result<u32, EngineError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| mismatch(key, "uint"))
}

pub fn read_number(key: &str, value: &Value) -> Result<f64, EngineError> {
    value.as_f64().ok_or_else(|| mismatch(key, "number"))
}

pub fn read_string(key: &str, value: &Value) -> Result<String, EngineError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(key, "string"))
}

pub fn read_object_text(key: &str, value: &Value) -> Result<String, EngineError> {
    if value.is_object() {
        Ok(value.to_string())
    } else {
        Err(mismatch(key, "object"))
    }
}

pub fn read_array_text(key: &str, value: &Value) -> Result<String, EngineError> {
    if value.is_array() {
        Ok(value.to_string())
    } else {
        Err(mismatch(key, "array"))
    }
}

fn mismatch(key: &str, expected: &'static str) -> EngineError {
    EngineError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(entries: &[(&str, Value)]) -> ParameterStore {
        let mut store = ParameterStore::new(true);
        for (key, value) in entries {
            store.validate(key, value).unwrap();
            store.insert(key.to_string(), value.clone());
        }
        store
    }

    #[test]
    fn unset_key_is_not_found() {
        let store = ParameterStore::new(true);
        assert_eq!(
            store.get_bool("rtc.audio.mute_me"),
            Err(EngineError::NotFound {
                key: "rtc.audio.mute_me".to_string()
            })
        );
    }

    #[test]
    fn typed_reads_coerce_within_range() {
        let store = store_with(&[
            ("a.int", json!(-3)),
            ("a.big", json!(u64::from(u32::MAX))),
            ("a.float", json!(1.5)),
        ]);

        assert_eq!(store.get_int("a.int").unwrap(), -3);
        assert_eq!(store.get_number("a.int").unwrap(), -3.0);
        assert!(matches!(store.get_uint("a.int"), Err(EngineError::TypeMismatch { .. })));

        assert_eq!(store.get_uint("a.big").unwrap(), u32::MAX);
        assert!(matches!(store.get_int("a.big"), Err(EngineError::TypeMismatch { .. })));

        assert_eq!(store.get_number("a.float").unwrap(), 1.5);
        assert!(matches!(store.get_int("a.float"), Err(EngineError::TypeMismatch { .. })));
    }

    #[test]
    fn object_and_array_reads_return_json_text() {
        let store = store_with(&[
            ("a.obj", json!({"uid": 1})),
            ("a.arr", json!([1, 2])),
        ]);
        assert_eq!(store.get_object("a.obj").unwrap(), "{\"uid\":1}");
        assert_eq!(store.get_array("a.arr").unwrap(), "[1,2]");
        assert!(store.get_array("a.obj").is_err());
        assert!(store.get_object("a.arr").is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        let store = ParameterStore::new(true);
        assert!(matches!(
            store.validate("", &json!(true)),
            Err(EngineError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn shape_enforcement_can_be_disabled() {
        let strict = ParameterStore::new(true);
        let lax = ParameterStore::new(false);
        let value = json!("yes");
        assert!(strict.validate("rtc.audio.mute_me", &value).is_err());
        assert!(lax.validate("rtc.audio.mute_me", &value).is_ok());
    }

    #[test]
    fn batch_duplicates_keep_the_last_value() {
        let batch = ParameterStore::parse_batch("{\"a\":1,\"a\":2}").unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch["a"], json!(2));
    }

    #[test]
    fn batch_must_be_an_object() {
        assert!(ParameterStore::parse_batch("[1]").is_err());
        assert!(ParameterStore::parse_batch("not json").is_err());
        assert!(ParameterStore::parse_batch("{}").unwrap().is_empty());
    }

    #[test]
    fn to_json_round_trips_through_parse_batch() {
        let store = store_with(&[("x.y", json!(true)), ("x.z", json!("s"))]);
        let reparsed = ParameterStore::parse_batch(&store.to_json()).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed["x.z"], json!("s"));
    }
}
