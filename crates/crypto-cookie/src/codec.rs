//! Allow-list cookie parsing and emission over the encryption engine.

use std::collections::{BTreeMap, HashSet};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::{debug, warn};

use common::{EncryptorError, Result};
use encryptor::{Encryptor, EncryptorConfig};

use crate::config::CookieConfig;
use crate::emit::{format_set_cookie, SetCookieOptions};

/// Escape set matching JavaScript's `encodeURIComponent`: everything except
/// ASCII alphanumerics and `- _ . ! ~ * ' ( )`. Base64 tokens contain `+`,
/// `/`, and `=`, all of which must be escaped inside a cookie value.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Cookie field codec: decrypts allow-listed pairs of a `Cookie:` header and
/// emits policy-gated `Set-Cookie` values.
pub struct CookieCodec {
    cipher: Encryptor,
    allowed: HashSet<String>,
    allow_all: bool,
}

impl CookieCodec {
    /// Construct a codec, building the engine from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if the engine configuration
    /// is invalid.
    pub fn new(encryptor: EncryptorConfig, cookie: CookieConfig) -> Result<Self> {
        Ok(Self::from_parts(Encryptor::new(encryptor)?, cookie))
    }

    /// Construct a codec around an existing engine.
    pub fn from_parts(cipher: Encryptor, cookie: CookieConfig) -> Self {
        Self {
            cipher,
            allowed: cookie.allowed.into_iter().collect(),
            allow_all: cookie.allow_all,
        }
    }

    /// Resolve a raw `Cookie:` header into a field map.
    ///
    /// The header is split on `;`; within each pair the first `=` delimits
    /// name from value (pairs without `=` are skipped), both sides are
    /// trimmed, one layer of surrounding double quotes is stripped, and only
    /// the first occurrence of a name is kept. Allow-listed names are
    /// percent-decoded, decrypted, and resolved to the component after the
    /// first `|` of the deciphered plaintext; with `allow_all`, unrecognized
    /// names carry their percent-decoded raw value; otherwise they are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Decryption failures for allow-listed fields propagate as
    /// [`EncryptorError::Authentication`] / [`EncryptorError::Format`] —
    /// never silently swallowed.
    pub fn parse(&self, header: &str) -> Result<BTreeMap<String, String>> {
        let mut fields = BTreeMap::new();
        let mut seen = HashSet::new();

        for pair in header.split(';') {
            let Some((name, value)) = split_pair(pair) else {
                continue;
            };
            if !seen.insert(name.to_owned()) {
                continue;
            }

            if self.allowed.contains(name) {
                let plaintext = self.decode_field(name, &percent_decode(value)?)?;
                match plaintext.split('|').nth(1) {
                    Some(resolved) => {
                        fields.insert(name.to_owned(), resolved.to_owned());
                    }
                    None => {
                        debug!(field = name, "deciphered cookie has no payload component");
                    }
                }
            } else if self.allow_all {
                fields.insert(name.to_owned(), percent_decode(value)?);
            } else {
                debug!(field = name, "cookie field not in allow-list, dropped");
            }
        }
        Ok(fields)
    }

    /// Decrypt one percent-encoded cookie value into the deciphered value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Encryptor::decrypt`].
    pub fn decode(&self, raw: &str) -> Result<Value> {
        self.cipher.decrypt(&percent_decode(raw)?)
    }

    /// Encrypt a value for emission as a cookie: synchronous encrypt, then
    /// percent-encode the token.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Encryptor::encrypt_sync`].
    pub fn encode(&self, value: &Value) -> Result<String> {
        let token = self.cipher.encrypt_sync(value, false)?;
        Ok(utf8_percent_encode(&token, COOKIE_VALUE).to_string())
    }

    /// Build a full `Set-Cookie` header value for `name`, or `None` when the
    /// allow-list policy forbids emitting it.
    ///
    /// Allow-listed names are encrypted then escaped; with `allow_all`,
    /// unrecognized names are emitted escaped but unencrypted; otherwise
    /// nothing is emitted.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CookieCodec::encode`].
    pub fn set_cookie(
        &self,
        name: &str,
        value: &Value,
        options: &SetCookieOptions,
    ) -> Result<Option<String>> {
        let encoded = if self.allowed.contains(name) {
            self.encode(value)?
        } else if self.allow_all {
            utf8_percent_encode(&plain_text(value)?, COOKIE_VALUE).to_string()
        } else {
            debug!(field = name, "cookie field not in allow-list, not emitted");
            return Ok(None);
        };
        Ok(Some(format_set_cookie(name, &encoded, options)))
    }

    fn decode_field(&self, name: &str, token: &str) -> Result<String> {
        let value = self.cipher.decrypt(token).map_err(|e| {
            warn!(field = name, error = %e, "cookie decryption failed");
            e
        })?;
        match value {
            Value::String(s) => Ok(s),
            _ => Err(EncryptorError::Format(
                "deciphered cookie is not a string".into(),
            )),
        }
    }
}

/// Split one `name=value` pair; `None` for fragments without `=`. Strips one
/// layer of surrounding double quotes from the value.
fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let eq = pair.find('=')?;
    let name = pair[..eq].trim();
    let mut value = pair[eq + 1..].trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value = &value[1..value.len() - 1];
    }
    Some((name, value))
}

/// Text form of a value emitted unencrypted under `allow_all`.
fn plain_text(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => serde_json::to_string(other)
            .map_err(|e| EncryptorError::Serialization(e.to_string())),
    }
}

fn percent_decode(value: &str) -> Result<String> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EncryptorError::Format("cookie value is not valid UTF-8".into()))
}
