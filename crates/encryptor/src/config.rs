//! Configuration surface consumed by the encryption engine.
//!
//! Values can be supplied programmatically or read from environment variables
//! (`KEY`, `KEY_LENGTH`, `RANDOM_BYTES`, `SERIALIZE_MODE`).

use common::{EncryptorError, Result};
use serde::Deserialize;

use crate::cipher::DEFAULT_RANDOM_BYTES;
use crate::serialize::SerializeMode;

/// Validated engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptorConfig {
    /// Base64-encoded secret. **Required.**
    pub key: String,

    /// Explicit key-length hint: 128 or 256. Absent a hint, the default
    /// cipher strength (256) is used.
    #[serde(default)]
    pub key_length: Option<u32>,

    /// Number of CSPRNG bytes drawn per IV. The hex encoding of these bytes
    /// is the raw IV, so only the default produces the 16 bytes CBC needs.
    #[serde(default = "default_random_bytes")]
    pub random_bytes: usize,

    /// Serializer driver applied to structured values.
    #[serde(default = "default_serialize_mode")]
    pub serialize_mode: SerializeMode,
}

fn default_random_bytes() -> usize {
    DEFAULT_RANDOM_BYTES
}
fn default_serialize_mode() -> SerializeMode {
    SerializeMode::Php
}

impl EncryptorConfig {
    /// Configuration with the given key and every other field at its default.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            key_length: None,
            random_bytes: default_random_bytes(),
            serialize_mode: default_serialize_mode(),
        }
    }

    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if a variable cannot be
    /// parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| {
                EncryptorError::Configuration(format!(
                    "failed to build configuration from environment: {e}"
                ))
            })?;

        let c: EncryptorConfig = cfg.try_deserialize().map_err(|e| {
            EncryptorError::Configuration(format!("failed to deserialise configuration: {e}"))
        })?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first
    /// failure.
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(EncryptorError::Configuration("no app key given".into()));
        }
        if let Some(bits) = self.key_length {
            if bits != 128 && bits != 256 {
                return Err(EncryptorError::Configuration(format!(
                    "the only supported ciphers are AES-128-CBC and AES-256-CBC \
                     with the correct key lengths, got {bits}"
                )));
            }
        }
        if self.random_bytes == 0 {
            return Err(EncryptorError::Configuration(
                "random_bytes must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_random_bytes(), 8);
        assert_eq!(default_serialize_mode(), SerializeMode::Php);
    }

    #[test]
    fn with_key_uses_defaults() {
        let cfg = EncryptorConfig::with_key("c2VjcmV0");
        assert_eq!(cfg.key, "c2VjcmV0");
        assert_eq!(cfg.key_length, None);
        assert_eq!(cfg.random_bytes, 8);
        assert_eq!(cfg.serialize_mode, SerializeMode::Php);
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = EncryptorConfig::with_key("  ");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsupported_key_length() {
        let mut cfg = EncryptorConfig::with_key("c2VjcmV0");
        cfg.key_length = Some(512);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_random_bytes() {
        let mut cfg = EncryptorConfig::with_key("c2VjcmV0");
        cfg.random_bytes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_both_key_lengths() {
        for bits in [128, 256] {
            let mut cfg = EncryptorConfig::with_key("c2VjcmV0");
            cfg.key_length = Some(bits);
            assert!(cfg.validate().is_ok(), "key_length {bits} should be valid");
        }
    }

    #[test]
    fn deserialises_from_json_with_defaults() {
        let cfg: EncryptorConfig =
            serde_json::from_str(r#"{"key": "c2VjcmV0", "serialize_mode": "json"}"#).unwrap();
        assert_eq!(cfg.serialize_mode, SerializeMode::Json);
        assert_eq!(cfg.random_bytes, 8);
        assert_eq!(cfg.key_length, None);
    }
}
