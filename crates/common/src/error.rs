//! Error taxonomy shared across crates.

use thiserror::Error;

/// Top-level error type for the encryption engine and the cookie codec.
///
/// Variants map to distinct failure classes with distinct handling:
/// - [`EncryptorError::Configuration`] — fatal at construction, never retried.
/// - [`EncryptorError::Input`] — caller bug (empty data), surfaced immediately.
/// - [`EncryptorError::Format`] — corrupt or foreign input, never retried.
/// - [`EncryptorError::Authentication`] — tampering or wrong key, never retried.
/// - [`EncryptorError::Serialization`] — recognized-but-corrupt serialized text.
#[derive(Debug, Error)]
pub enum EncryptorError {
    /// Bad or missing key, unsupported key length, or an invalid serializer.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty data passed to encrypt or decrypt.
    #[error("input error: {0}")]
    Input(String),

    /// Malformed token: bad base64, invalid JSON, missing payload fields, or
    /// a wrong-shaped IV.
    #[error("format error: {0}")]
    Format(String),

    /// MAC mismatch or a cipher-level decrypt failure.
    ///
    /// One uniform message for both cases: callers (and attackers probing the
    /// decrypt path) must not be able to tell which check rejected the token.
    #[error("the MAC is invalid")]
    Authentication,

    /// The decrypted plaintext was recognized as serialized content but could
    /// not be deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EncryptorError {
    /// Returns `true` for failures caused by the supplied token rather than
    /// by local configuration or caller misuse.
    pub fn is_data_dependent(&self) -> bool {
        matches!(
            self,
            EncryptorError::Format(_)
                | EncryptorError::Authentication
                | EncryptorError::Serialization(_)
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, EncryptorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let e = EncryptorError::Configuration("no app key given".into());
        assert!(e.to_string().contains("no app key given"));
    }

    #[test]
    fn authentication_message_is_uniform() {
        // The Display output carries no detail about which check failed.
        assert_eq!(
            EncryptorError::Authentication.to_string(),
            "the MAC is invalid"
        );
    }

    #[test]
    fn data_dependent_classification() {
        assert!(EncryptorError::Authentication.is_data_dependent());
        assert!(EncryptorError::Format("bad json".into()).is_data_dependent());
        assert!(!EncryptorError::Configuration("bad key".into()).is_data_dependent());
        assert!(!EncryptorError::Input("no data given".into()).is_data_dependent());
    }
}
