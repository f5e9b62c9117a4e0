//! Wire-format payload codec: the `{iv, value, mac}` JSON document and its
//! base64 token framing.
//!
//! # Token format
//!
//! ```text
//! token = base64( {"iv": <base64 string>, "value": <base64 string>, "mac": <hex string>} )
//! ```
//!
//! The `iv` field base64-decodes to exactly 16 bytes: the literal ASCII
//! characters of a 16-hex-character string derived from 8 random bytes. Those
//! 16 bytes are also the raw IV fed to the block cipher. This double encoding
//! is a fixed interoperability detail of the format, shared with an
//! independently-implemented decryptor.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{EncryptorError, Result};

/// Number of hex characters the decoded `iv` field must expand to.
pub const IV_HEX_LEN: usize = 32;

/// One encrypted payload as it appears on the wire, before token framing.
///
/// Constructed per encrypt call and consumed per decrypt call; never persisted
/// beyond one round trip. Field order is fixed — the JSON document is emitted
/// as `{"iv":…,"value":…,"mac":…}` and external decryptors parse it as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Base64 encoding of the ASCII hex string used as the cipher IV.
    pub iv: String,
    /// Base64 ciphertext.
    pub value: String,
    /// Lowercase hex HMAC-SHA256 over the UTF-8 bytes of `iv ++ value`.
    pub mac: String,
}

impl EncryptedPayload {
    /// Construct a payload from its three wire fields.
    pub fn new(iv: impl Into<String>, value: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            iv: iv.into(),
            value: value.into(),
            mac: mac.into(),
        }
    }

    /// Frame this payload as a transport-safe token: JSON, then base64.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Serialization`] if JSON encoding fails
    /// (practically unreachable for a struct of three strings).
    pub fn to_token(&self) -> Result<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| EncryptorError::Serialization(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Unframe a token back into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Format`] if the token is not base64-wrapped
    /// UTF-8 JSON, or if any of the `iv`, `value`, `mac` keys is absent or not
    /// a string.
    pub fn from_token(token: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(token)
            .map_err(|_| EncryptorError::Format("cannot parse payload JSON".into()))?;
        let text = String::from_utf8(raw)
            .map_err(|_| EncryptorError::Format("cannot parse payload JSON".into()))?;
        let doc: serde_json::Value = serde_json::from_str(&text)
            .map_err(|_| EncryptorError::Format("cannot parse payload JSON".into()))?;

        let field = |name: &str| -> Result<String> {
            doc.get(name)
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| EncryptorError::Format("the payload is invalid".into()))
        };

        Ok(Self {
            iv: field("iv")?,
            value: field("value")?,
            mac: field("mac")?,
        })
    }

    /// Check the IV shape invariant: base64-decoding `iv` and hex-encoding
    /// the result must yield exactly [`IV_HEX_LEN`] hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Format`] on any other shape.
    pub fn validate_iv_shape(&self) -> Result<()> {
        let raw = STANDARD
            .decode(&self.iv)
            .map_err(|_| EncryptorError::Format("the payload is invalid".into()))?;
        if hex::encode(&raw).len() != IV_HEX_LEN {
            return Err(EncryptorError::Format("the payload is invalid".into()));
        }
        Ok(())
    }

    /// The exact byte sequence the MAC is computed over: the UTF-8 bytes of
    /// the `iv` string concatenated with the `value` string, as they appear in
    /// the payload — not their decoded binary forms.
    pub fn mac_message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(self.iv.len() + self.value.len());
        msg.extend_from_slice(self.iv.as_bytes());
        msg.extend_from_slice(self.value.as_bytes());
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedPayload {
        // iv = base64 of the 16 ASCII chars "0123456789abcdef"
        EncryptedPayload::new(
            STANDARD.encode("0123456789abcdef"),
            STANDARD.encode([0u8; 32]),
            "ab".repeat(32),
        )
    }

    #[test]
    fn token_round_trip() {
        let payload = sample();
        let token = payload.to_token().unwrap();
        let decoded = EncryptedPayload::from_token(&token).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn token_json_field_order_is_iv_value_mac() {
        let payload = sample();
        let token = payload.to_token().unwrap();
        let json = String::from_utf8(STANDARD.decode(token).unwrap()).unwrap();
        let iv_pos = json.find("\"iv\"").unwrap();
        let value_pos = json.find("\"value\"").unwrap();
        let mac_pos = json.find("\"mac\"").unwrap();
        assert!(iv_pos < value_pos && value_pos < mac_pos, "got: {json}");
    }

    #[test]
    fn from_token_rejects_bad_base64() {
        let err = EncryptedPayload::from_token("!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, EncryptorError::Format(_)));
    }

    #[test]
    fn from_token_rejects_non_json() {
        let token = STANDARD.encode("definitely not json");
        let err = EncryptedPayload::from_token(&token).unwrap_err();
        assert!(matches!(err, EncryptorError::Format(_)));
    }

    #[test]
    fn from_token_rejects_missing_mac_key() {
        let token = STANDARD.encode(r#"{"iv":"aXY=","value":"dmFsdWU="}"#);
        let err = EncryptedPayload::from_token(&token).unwrap_err();
        assert!(matches!(err, EncryptorError::Format(_)));
    }

    #[test]
    fn from_token_rejects_non_string_field() {
        let token = STANDARD.encode(r#"{"iv":42,"value":"dmFsdWU=","mac":"00"}"#);
        let err = EncryptedPayload::from_token(&token).unwrap_err();
        assert!(matches!(err, EncryptorError::Format(_)));
    }

    #[test]
    fn iv_shape_accepts_16_raw_bytes() {
        assert!(sample().validate_iv_shape().is_ok());
    }

    #[test]
    fn iv_shape_rejects_other_lengths() {
        let mut payload = sample();
        payload.iv = STANDARD.encode("too-short");
        assert!(matches!(
            payload.validate_iv_shape().unwrap_err(),
            EncryptorError::Format(_)
        ));
    }

    #[test]
    fn mac_message_concatenates_wire_strings() {
        let payload = EncryptedPayload::new("aXY=", "dmFs", "00");
        assert_eq!(payload.mac_message(), b"aXY=dmFs");
    }
}
