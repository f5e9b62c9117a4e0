//! Serializer adapter: the capability trait every value codec implements and
//! the driver selection done once at engine construction.

pub mod json;
pub mod php;

pub use json::JsonSerializer;
pub use php::PhpSerializer;

use common::{EncryptorError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Capability interface for pluggable value codecs.
///
/// Implementations declare both directions statically; the type system
/// replaces the runtime "does it have these two methods" probing the external
/// system performs. `deserialize` must return text it does not recognize as
/// serialized content unchanged (as a string value) rather than failing —
/// pass-through is policy, not an error.
#[cfg_attr(test, mockall::automock)]
pub trait Serializer: Send + Sync {
    /// Encode a value as text.
    fn serialize(&self, value: &Value) -> Result<String>;

    /// Decode text back into a value, passing unrecognized text through.
    fn deserialize(&self, text: &str) -> Result<Value>;
}

/// Serializer driver named in the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializeMode {
    /// Direct structural JSON (de)serialization.
    Json,
    /// PHP `serialize()`-format codec.
    Php,
    /// Caller-supplied [`Serializer`] implementation.
    Custom,
}

impl std::fmt::Display for SerializeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SerializeMode::Json => "json",
            SerializeMode::Php => "php",
            SerializeMode::Custom => "custom",
        })
    }
}

/// The driver an engine instance actually runs. Selected once at
/// construction; stateless thereafter.
pub(crate) enum Driver {
    Json(JsonSerializer),
    Php(PhpSerializer),
    Custom(Box<dyn Serializer>),
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Driver::Json(_) => f.write_str("Driver::Json"),
            Driver::Php(_) => f.write_str("Driver::Php"),
            Driver::Custom(_) => f.write_str("Driver::Custom"),
        }
    }
}

impl Driver {
    /// Resolve a configured mode into a driver.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] for [`SerializeMode::Custom`]
    /// — a custom driver must be supplied as an instance, not named in config.
    pub fn from_mode(mode: SerializeMode) -> Result<Self> {
        match mode {
            SerializeMode::Json => Ok(Driver::Json(JsonSerializer)),
            SerializeMode::Php => Ok(Driver::Php(PhpSerializer)),
            SerializeMode::Custom => Err(EncryptorError::Configuration(
                "serialize_mode \"custom\" requires an explicit serializer driver".into(),
            )),
        }
    }

    /// Wrap a caller-supplied implementation.
    pub fn custom(driver: Box<dyn Serializer>) -> Self {
        Driver::Custom(driver)
    }

    /// Whether the active driver is the PHP-compatible one. The
    /// `force_serialize` encrypt flag only has effect for this driver.
    pub fn is_php(&self) -> bool {
        matches!(self, Driver::Php(_))
    }
}

impl Serializer for Driver {
    fn serialize(&self, value: &Value) -> Result<String> {
        match self {
            Driver::Json(d) => d.serialize(value),
            Driver::Php(d) => d.serialize(value),
            Driver::Custom(d) => d.serialize(value),
        }
    }

    fn deserialize(&self, text: &str) -> Result<Value> {
        match self {
            Driver::Json(d) => d.deserialize(text),
            Driver::Php(d) => d.deserialize(text),
            Driver::Custom(d) => d.deserialize(text),
        }
    }
}
