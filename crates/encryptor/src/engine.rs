//! The encryption engine: serialize → encrypt → authenticate → frame, and the
//! inverse de-frame → verify → decrypt → deserialize.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tracing::warn;

use common::{EncryptedPayload, EncryptorError, Result};

use crate::cipher;
use crate::config::EncryptorConfig;
use crate::key::{CipherAlgorithm, KeyMaterial, DEFAULT_KEY_LENGTH};
use crate::serialize::{Driver, Serializer};

/// Authenticated encryption of arbitrary values into transport-safe tokens.
///
/// An instance owns its [`KeyMaterial`] and serializer, both fixed at
/// construction. Every encrypt/decrypt call is a pure function of its inputs
/// plus the immutable key, so instances are safe to share read-only across
/// concurrent calls; no locks are held anywhere.
pub struct Encryptor {
    key: KeyMaterial,
    algorithm: CipherAlgorithm,
    random_bytes: usize,
    driver: Driver,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("algorithm", &self.algorithm)
            .field("random_bytes", &self.random_bytes)
            .field("driver", &self.driver)
            .finish()
    }
}

impl Encryptor {
    /// Construct an engine from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] for a missing/invalid key, an
    /// unsupported key length, or an unresolvable serialize mode.
    pub fn new(config: EncryptorConfig) -> Result<Self> {
        config.validate()?;
        let driver = Driver::from_mode(config.serialize_mode)?;
        Self::build(config, driver)
    }

    /// Construct an engine with a caller-supplied serializer implementation.
    ///
    /// The driver's capabilities are declared by the [`Serializer`] trait
    /// bound, so no runtime probing happens here.
    pub fn with_driver(config: EncryptorConfig, driver: Box<dyn Serializer>) -> Result<Self> {
        config.validate()?;
        Self::build(config, Driver::custom(driver))
    }

    fn build(config: EncryptorConfig, driver: Driver) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::from_base64(&config.key)?,
            algorithm: CipherAlgorithm::from_hint(config.key_length)?,
            random_bytes: config.random_bytes,
            driver,
        })
    }

    // -----------------------------------------------------------------------
    // Encrypt
    // -----------------------------------------------------------------------

    /// Encrypt a value into a token.
    ///
    /// The only suspension point is CSPRNG byte generation for the IV, which
    /// runs on the blocking pool; everything else is identical to
    /// [`Encryptor::encrypt_sync`].
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Input`] for empty input and
    /// [`EncryptorError::Configuration`] if the key does not fit the selected
    /// cipher.
    pub async fn encrypt(&self, value: &Value, force_serialize: bool) -> Result<String> {
        let data = self.prepare_payload(value, force_serialize)?;
        let random_bytes = self.random_bytes;
        let iv_hex = tokio::task::spawn_blocking(move || cipher::generate_iv_hex(random_bytes))
            .await
            .map_err(|e| {
                EncryptorError::Configuration(format!("random generator task failed: {e}"))
            })??;
        self.seal(&data, &iv_hex)
    }

    /// Encrypt a value into a token without yielding.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Encryptor::encrypt`].
    pub fn encrypt_sync(&self, value: &Value, force_serialize: bool) -> Result<String> {
        let data = self.prepare_payload(value, force_serialize)?;
        let iv_hex = cipher::generate_iv_hex(self.random_bytes)?;
        self.seal(&data, &iv_hex)
    }

    /// Cipher the prepared text with a fresh IV and frame the result.
    fn seal(&self, data: &str, iv_hex: &str) -> Result<String> {
        let ciphertext = cipher::encrypt_cbc(
            self.algorithm,
            self.key.as_bytes(),
            iv_hex.as_bytes(),
            data.as_bytes(),
        )?;

        let mut payload = EncryptedPayload::new(
            STANDARD.encode(iv_hex),
            STANDARD.encode(ciphertext),
            String::new(),
        );
        payload.mac = cipher::compute_mac(self.key.as_bytes(), &payload.mac_message())?;
        payload.to_token()
    }

    /// Prepare a value for the cipher.
    ///
    /// With `force_serialize` and the PHP driver active, the value is always
    /// serialized regardless of type. Otherwise numbers are stringified,
    /// strings pass through unchanged, and everything else goes through the
    /// active serializer.
    fn prepare_payload(&self, value: &Value, force_serialize: bool) -> Result<String> {
        if value.is_null() {
            return Err(EncryptorError::Input("no data given".into()));
        }

        let data = if force_serialize && self.driver.is_php() {
            self.driver.serialize(value)?
        } else {
            match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                other => self.driver.serialize(other)?,
            }
        };

        if data.is_empty() {
            return Err(EncryptorError::Input("no data given".into()));
        }
        Ok(data)
    }

    // -----------------------------------------------------------------------
    // Decrypt
    // -----------------------------------------------------------------------

    /// Decrypt a token back into a value.
    ///
    /// The MAC is recomputed over the wire-form `iv` and `value` strings and
    /// compared in constant time before the cipher runs; plaintext that the
    /// active serializer does not recognize is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`EncryptorError::Input`] for an empty token.
    /// - [`EncryptorError::Format`] for malformed framing or a wrong-shaped IV.
    /// - [`EncryptorError::Authentication`] for a MAC mismatch or a cipher
    ///   failure — one uniform error for both.
    /// - [`EncryptorError::Serialization`] for recognized-but-corrupt
    ///   plaintext.
    pub fn decrypt(&self, token: &str) -> Result<Value> {
        if token.is_empty() {
            return Err(EncryptorError::Input("no data given".into()));
        }

        let payload = EncryptedPayload::from_token(token)?;
        payload.validate_iv_shape()?;

        if !self.valid_mac(&payload) {
            return Err(EncryptorError::Authentication);
        }

        // Shape was validated above; the raw bytes are the ASCII hex string.
        let iv = STANDARD
            .decode(&payload.iv)
            .map_err(|_| EncryptorError::Format("the payload is invalid".into()))?;
        let ciphertext = STANDARD
            .decode(&payload.value)
            .map_err(|_| EncryptorError::Authentication)?;

        let plaintext = cipher::decrypt_cbc(self.algorithm, self.key.as_bytes(), &iv, &ciphertext)?;
        let text = String::from_utf8(plaintext).map_err(|_| EncryptorError::Authentication)?;

        self.driver.deserialize(&text)
    }

    /// Constant-time MAC verification.
    ///
    /// Any failure inside the computation itself collapses to "invalid"
    /// rather than a distinct error, so the decrypt path reports exactly one
    /// thing about a bad token.
    fn valid_mac(&self, payload: &EncryptedPayload) -> bool {
        match cipher::compute_mac(self.key.as_bytes(), &payload.mac_message()) {
            Ok(expected) => cipher::mac_equal(&expected, &payload.mac),
            Err(e) => {
                warn!(error = %e, "MAC computation failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // One-shot helpers
    // -----------------------------------------------------------------------

    /// One-shot encrypt: construct a default engine for `key` and encrypt
    /// `value` synchronously.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Encryptor::new`] and [`Encryptor::encrypt_sync`].
    pub fn static_cipher(key: &str, value: &Value) -> Result<String> {
        Encryptor::new(EncryptorConfig::with_key(key))?.encrypt_sync(value, false)
    }

    /// One-shot decrypt: construct a default engine for `key` and decrypt
    /// `token`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Encryptor::new`] and [`Encryptor::decrypt`].
    pub fn static_decipher(key: &str, token: &str) -> Result<Value> {
        Encryptor::new(EncryptorConfig::with_key(key))?.decrypt(token)
    }

    /// Generate a random application key: base64 of 128 or 256 CSPRNG bits.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] for any other bit count or
    /// if the OS random source is unavailable.
    pub fn generate_random_key(bits: Option<u32>) -> Result<String> {
        let bits = bits.unwrap_or(DEFAULT_KEY_LENGTH);
        if bits != 128 && bits != 256 {
            return Err(EncryptorError::Configuration(format!(
                "valid key lengths are 128 and 256, got {bits}"
            )));
        }
        Ok(STANDARD.encode(cipher::secure_random_bytes(bits as usize / 8)?))
    }
}
