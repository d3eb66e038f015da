//! Builders for the JSON payloads the facade sends over the bus.
//!
//! Payloads are serialized by `serde_json`, so string fields are always
//! escaped and there is no upper bound on payload length.

use serde_json::{Map, Value};

/// Object payload for `set_object`, e.g. `{"uid":7,"mute":true}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCommand {
    fields: Map<String, Value>,
}

impl ObjectCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

/// Multi-key document for `set_parameters`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParametersCommand {
    entries: Map<String, Value>,
}

impl ParametersCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.entries.clone()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_command_serializes_fields() {
        let payload = ObjectCommand::new().field("uid", 7u32).field("mute", true);
        let parsed: Value = serde_json::from_str(&payload.to_json()).unwrap();
        assert_eq!(parsed, json!({"uid": 7, "mute": true}));
    }

    #[test]
    fn string_fields_are_escaped() {
        let path = "C:\\media\\\"quoted\".mp3";
        let payload = ObjectCommand::new().field("filePath", path).to_json();
        let parsed: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["filePath"], json!(path));
    }

    #[test]
    fn long_values_are_not_truncated() {
        let path = format!("/tmp/{}.wav", "a".repeat(600));
        let payload = ObjectCommand::new().field("filePath", path.as_str()).to_json();
        assert!(payload.len() > 512);
        let parsed: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["filePath"].as_str().unwrap(), path);
    }

    #[test]
    fn parameters_command_collects_keys() {
        let command = ParametersCommand::new()
            .set("rtc.audio.mute_me", true)
            .set("che.audio.mute_me", true);
        assert_eq!(command.len(), 2);
        let parsed: Value = serde_json::from_str(&command.to_json()).unwrap();
        assert_eq!(parsed["che.audio.mute_me"], json!(true));
    }
}
