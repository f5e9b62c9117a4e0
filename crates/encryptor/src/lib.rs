//! Authenticated symmetric encryption of arbitrary values into transport-safe
//! tokens, wire-compatible with Laravel's `Illuminate/Encryption/Encrypter`.
//!
//! Pipeline (encrypt): serialize → AES-CBC encrypt → HMAC-SHA256 authenticate
//! → frame as `base64({"iv", "value", "mac"})`. Decrypt runs the inverse with
//! a constant-time MAC check before the cipher is touched.
//!
//! Only `aes-128-cbc` and `aes-256-cbc` are available; the variant is fixed at
//! construction from the configured key length. An [`Encryptor`] instance owns
//! its key material and serializer and is safe to share read-only across
//! concurrent calls.

pub mod cipher;
pub mod config;
pub mod engine;
pub mod key;
pub mod serialize;

pub use config::EncryptorConfig;
pub use engine::Encryptor;
pub use key::{CipherAlgorithm, KeyMaterial};
pub use serialize::{SerializeMode, Serializer};
