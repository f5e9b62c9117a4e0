//! JSON serializer driver.

use common::{EncryptorError, Result};
use serde_json::Value;

use super::Serializer;

/// Direct structural JSON (de)serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<String> {
        serde_json::to_string(value).map_err(|e| EncryptorError::Serialization(e.to_string()))
    }

    fn deserialize(&self, text: &str) -> Result<Value> {
        // Text that does not parse as JSON is passed through unchanged.
        Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialises_structured_values() {
        let text = JsonSerializer.serialize(&json!({"a": 1, "b": [true, null]})).unwrap();
        assert_eq!(text, r#"{"a":1,"b":[true,null]}"#);
    }

    #[test]
    fn round_trips_objects() {
        let value = json!({"user": {"id": 7, "name": "Alice"}});
        let text = JsonSerializer.serialize(&value).unwrap();
        assert_eq!(JsonSerializer.deserialize(&text).unwrap(), value);
    }

    #[test]
    fn unparseable_text_passes_through() {
        let out = JsonSerializer.deserialize("ferrets better than cats").unwrap();
        assert_eq!(out, Value::String("ferrets better than cats".into()));
    }

    #[test]
    fn numeric_text_parses_as_number() {
        assert_eq!(JsonSerializer.deserialize("42").unwrap(), json!(42));
    }
}
