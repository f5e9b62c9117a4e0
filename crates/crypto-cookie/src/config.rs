//! Configuration surface for the cookie field codec.

use serde::Deserialize;

/// Allow-list policy applied to every cookie pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieConfig {
    /// Cookie field names whose values are eligible for decryption.
    #[serde(default)]
    pub allowed: Vec<String>,

    /// When `true`, unrecognized fields are exposed percent-decoded and
    /// untouched by the cipher instead of being dropped.
    #[serde(default)]
    pub allow_all: bool,
}

impl CookieConfig {
    /// Build a config from an allow-list and the pass-through flag.
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>, allow_all: bool) -> Self {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            allow_all,
        }
    }
}
