//! Key material and cipher-algorithm selection.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{EncryptorError, Result};

/// Default cipher strength when no explicit key-length hint is configured.
pub const DEFAULT_KEY_LENGTH: u32 = 256;

/// The two supported cipher variants. Selected once at engine construction;
/// never changes for the lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    /// AES with a 128-bit key in CBC mode.
    Aes128Cbc,
    /// AES with a 256-bit key in CBC mode.
    Aes256Cbc,
}

impl CipherAlgorithm {
    /// Select the algorithm from an optional key-length hint (128 or 256).
    /// Absent a hint, the default cipher strength is used.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] for any other hint value.
    pub fn from_hint(hint: Option<u32>) -> Result<Self> {
        match hint.unwrap_or(DEFAULT_KEY_LENGTH) {
            128 => Ok(CipherAlgorithm::Aes128Cbc),
            256 => Ok(CipherAlgorithm::Aes256Cbc),
            other => Err(EncryptorError::Configuration(format!(
                "the only supported ciphers are AES-128-CBC and AES-256-CBC \
                 with the correct key lengths, got {other}"
            ))),
        }
    }

    /// Key length in bytes required by the underlying block cipher.
    pub const fn key_len(self) -> usize {
        match self {
            CipherAlgorithm::Aes128Cbc => 16,
            CipherAlgorithm::Aes256Cbc => 32,
        }
    }
}

impl std::fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CipherAlgorithm::Aes128Cbc => "aes-128-cbc",
            CipherAlgorithm::Aes256Cbc => "aes-256-cbc",
        })
    }
}

/// Raw secret bytes decoded from the configured base64 key string.
///
/// Immutable for the lifetime of an engine instance. The decoded length is
/// deliberately not cross-checked against the selected algorithm here — the
/// external system this format interoperates with is equally permissive, and
/// a wrong-length key surfaces as a configuration error at the first cipher
/// construction instead.
///
/// The memory is overwritten with zeroes on drop so plaintext key material
/// does not outlive the engine in RAM.
#[derive(Clone)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Decode a base64 secret into raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if the key is empty or not
    /// valid base64.
    pub fn from_base64(key: &str) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(EncryptorError::Configuration("no app key given".into()));
        }
        let bytes = STANDARD
            .decode(key)
            .map_err(|e| EncryptorError::Configuration(format!("app key is not valid base64: {e}")))?;
        Ok(Self(bytes))
    }

    /// Borrow the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}
