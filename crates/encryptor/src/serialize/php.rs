//! PHP `serialize()`-format driver.
//!
//! Covers the scalar and array subset of the format:
//!
//! ```text
//! N;                        null
//! b:0;  b:1;                booleans
//! i:<int>;                  integers
//! d:<float>;                floats
//! s:<byte-len>:"<bytes>";   strings (length-prefixed, no escaping)
//! a:<count>:{<key><value>…} arrays (int or string keys)
//! ```
//!
//! `deserialize` only attempts parsing when the text is recognized as being
//! in the format; anything else passes through unchanged. Object (`O:`)
//! payloads are recognized but rejected as unsupported.

use common::{EncryptorError, Result};
use serde_json::Value;

use super::Serializer;

/// PHP-compatible value codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpSerializer;

impl Serializer for PhpSerializer {
    fn serialize(&self, value: &Value) -> Result<String> {
        let mut out = String::new();
        write_value(&mut out, value);
        Ok(out)
    }

    fn deserialize(&self, text: &str) -> Result<Value> {
        if !is_serialized(text) {
            return Ok(Value::String(text.to_owned()));
        }
        let mut parser = Parser::new(text.as_bytes());
        let value = parser.parse_value()?;
        parser.expect_end()?;
        Ok(value)
    }
}

/// Quick shape check deciding whether text looks like PHP-serialized data.
///
/// Mirrors the recognizer of the external `php-serialize` implementation:
/// `N;` or `<type>:` where type is one of `a b d i s S O`, ending in `;` or
/// `}`. Plain prose never matches, so pass-through data survives untouched.
pub(crate) fn is_serialized(text: &str) -> bool {
    if text == "N;" {
        return true;
    }
    let bytes = text.as_bytes();
    bytes.len() >= 4
        && matches!(bytes[0], b'a' | b'b' | b'd' | b'i' | b's' | b'S' | b'O')
        && bytes[1] == b':'
        && matches!(bytes[bytes.len() - 1], b';' | b'}')
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&format!("i:{i};"));
            } else if let Some(u) = n.as_u64() {
                out.push_str(&format!("i:{u};"));
            } else {
                // as_f64 is always Some for a finite JSON number.
                out.push_str(&format!("d:{};", n.as_f64().unwrap_or(0.0)));
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (index, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{index};"));
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Object(map) => {
            out.push_str(&format!("a:{}:{{", map.len()));
            for (key, item) in map {
                write_string(out, key);
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    // Length prefix counts bytes, not characters; the payload is raw.
    out.push_str(&format!("s:{}:\"{s}\";", s.len()));
}

// ---------------------------------------------------------------------------
// Deserialization
// ---------------------------------------------------------------------------

/// PHP array key: integer or string.
enum Key {
    Int(i64),
    Str(String),
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.peek()? {
            b'N' => {
                self.expect(b"N;")?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b"b:")?;
                let flag = self.take_until(b';')?;
                match flag {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err(corrupt()),
                }
            }
            b'i' => {
                self.expect(b"i:")?;
                let digits = self.take_until(b';')?;
                if let Ok(i) = digits.parse::<i64>() {
                    Ok(Value::Number(i.into()))
                } else if let Ok(u) = digits.parse::<u64>() {
                    Ok(Value::Number(u.into()))
                } else {
                    Err(corrupt())
                }
            }
            b'd' => {
                self.expect(b"d:")?;
                let digits = self.take_until(b';')?;
                let f = digits.parse::<f64>().map_err(|_| corrupt())?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(corrupt)
            }
            b's' => Ok(Value::String(self.parse_string()?)),
            b'a' => self.parse_array(),
            b'S' | b'O' => Err(EncryptorError::Serialization(
                "php escaped-string and object payloads are not supported".into(),
            )),
            _ => Err(corrupt()),
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        self.expect(b"s:")?;
        let len: usize = self.take_until(b':')?.parse().map_err(|_| corrupt())?;
        self.expect(b"\"")?;
        let bytes = self.take_exact(len)?;
        let s = std::str::from_utf8(bytes).map_err(|_| corrupt())?.to_owned();
        self.expect(b"\";")?;
        Ok(s)
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.expect(b"a:")?;
        let count: usize = self.take_until(b':')?.parse().map_err(|_| corrupt())?;
        self.expect(b"{")?;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let key = match self.peek()? {
                b'i' => {
                    self.expect(b"i:")?;
                    Key::Int(self.take_until(b';')?.parse().map_err(|_| corrupt())?)
                }
                b's' => Key::Str(self.parse_string()?),
                _ => return Err(corrupt()),
            };
            entries.push((key, self.parse_value()?));
        }
        self.expect(b"}")?;

        // Sequential integer keys starting at zero form a list; anything else
        // becomes an object with stringified keys.
        let sequential = entries
            .iter()
            .enumerate()
            .all(|(index, (key, _))| matches!(key, Key::Int(i) if *i == index as i64));

        if sequential {
            Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
        } else {
            let map = entries
                .into_iter()
                .map(|(key, v)| {
                    let key = match key {
                        Key::Int(i) => i.to_string(),
                        Key::Str(s) => s,
                    };
                    (key, v)
                })
                .collect();
            Ok(Value::Object(map))
        }
    }

    fn peek(&self) -> Result<u8> {
        self.input.get(self.pos).copied().ok_or_else(corrupt)
    }

    fn expect(&mut self, literal: &[u8]) -> Result<()> {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(corrupt())
        }
    }

    /// Consume bytes up to (and including) the delimiter; returns the slice
    /// before it as UTF-8 text.
    fn take_until(&mut self, delimiter: u8) -> Result<&'a str> {
        let start = self.pos;
        let offset = self.input[start..]
            .iter()
            .position(|&b| b == delimiter)
            .ok_or_else(corrupt)?;
        self.pos = start + offset + 1;
        std::str::from_utf8(&self.input[start..start + offset]).map_err(|_| corrupt())
    }

    fn take_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.pos + len > self.input.len() {
            return Err(corrupt());
        }
        let slice = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(corrupt())
        }
    }
}

fn corrupt() -> EncryptorError {
    EncryptorError::Serialization("cannot unserialize php data".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(value: Value) -> Value {
        let text = PhpSerializer.serialize(&value).unwrap();
        PhpSerializer.deserialize(&text).unwrap()
    }

    #[test]
    fn serialises_scalars() {
        assert_eq!(PhpSerializer.serialize(&Value::Null).unwrap(), "N;");
        assert_eq!(PhpSerializer.serialize(&json!(true)).unwrap(), "b:1;");
        assert_eq!(PhpSerializer.serialize(&json!(false)).unwrap(), "b:0;");
        assert_eq!(PhpSerializer.serialize(&json!(42)).unwrap(), "i:42;");
        assert_eq!(PhpSerializer.serialize(&json!(-7)).unwrap(), "i:-7;");
        assert_eq!(PhpSerializer.serialize(&json!(1.5)).unwrap(), "d:1.5;");
    }

    #[test]
    fn serialises_strings_with_byte_length() {
        assert_eq!(
            PhpSerializer.serialize(&json!("ferrets")).unwrap(),
            "s:7:\"ferrets\";"
        );
        // Two characters, three bytes.
        assert_eq!(
            PhpSerializer.serialize(&json!("hé")).unwrap(),
            "s:3:\"hé\";"
        );
    }

    #[test]
    fn serialises_lists_with_index_keys() {
        assert_eq!(
            PhpSerializer.serialize(&json!(["a", "b"])).unwrap(),
            "a:2:{i:0;s:1:\"a\";i:1;s:1:\"b\";}"
        );
    }

    #[test]
    fn serialises_maps_with_string_keys() {
        assert_eq!(
            PhpSerializer.serialize(&json!({"id": 7})).unwrap(),
            "a:1:{s:2:\"id\";i:7;}"
        );
    }

    #[test]
    fn round_trips_nested_structures() {
        let value = json!({
            "name": "Alice",
            "tags": ["admin", "ops"],
            "meta": {"active": true, "score": 1.5, "note": null}
        });
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn round_trips_strings_containing_quotes_and_pipes() {
        // Length-prefixed payloads need no escaping.
        let value = json!("he said \"hi\" | twice");
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn unrecognized_text_passes_through() {
        for text in ["ferrets better than cats", "123", "s:almost", ""] {
            assert_eq!(
                PhpSerializer.deserialize(text).unwrap(),
                Value::String(text.into()),
                "expected pass-through for {text:?}"
            );
        }
    }

    #[test]
    fn recognized_but_corrupt_is_a_serialization_error() {
        for text in ["i:notanumber;", "s:99:\"short\";", "a:2:{i:0;i:1;}", "b:7;"] {
            let err = PhpSerializer.deserialize(text).unwrap_err();
            assert!(
                matches!(err, EncryptorError::Serialization(_)),
                "expected serialization error for {text:?}"
            );
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = PhpSerializer.deserialize("i:1;i:2;").unwrap_err();
        assert!(matches!(err, EncryptorError::Serialization(_)));
    }

    #[test]
    fn object_payloads_are_unsupported() {
        let err = PhpSerializer
            .deserialize("O:8:\"stdClass\":0:{}")
            .unwrap_err();
        assert!(matches!(err, EncryptorError::Serialization(_)));
    }

    #[test]
    fn non_sequential_int_keys_become_an_object() {
        let value = PhpSerializer.deserialize("a:2:{i:5;s:1:\"a\";i:9;s:1:\"b\";}").unwrap();
        assert_eq!(value, json!({"5": "a", "9": "b"}));
    }

    #[test]
    fn null_round_trip() {
        assert_eq!(round_trip(Value::Null), Value::Null);
    }
}
