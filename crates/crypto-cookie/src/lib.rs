//! Selective decryption of named fields inside an HTTP `Cookie:` header, and
//! the matching policy-gated `Set-Cookie` emission.
//!
//! A [`CookieCodec`] owns an [`encryptor::Encryptor`] plus an allow-list of
//! field names. Parsing decodes only recognized pairs through the engine;
//! everything else is passed through raw or dropped, depending on the
//! `allow_all` policy. Emission mirrors the same policy in reverse.

pub mod codec;
pub mod config;
pub mod emit;

pub use codec::CookieCodec;
pub use config::CookieConfig;
pub use emit::{SameSite, SetCookieOptions};
