//! `Set-Cookie` attribute rendering.

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub const fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes appended to an emitted `Set-Cookie` value.
#[derive(Debug, Clone, Default)]
pub struct SetCookieOptions {
    pub domain: Option<String>,
    pub path: Option<String>,
    /// Lifetime in seconds (`Max-Age`).
    pub max_age: Option<u64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

/// Render a full `Set-Cookie` header value from an already-escaped cookie
/// value and its attributes.
pub(crate) fn format_set_cookie(name: &str, value: &str, options: &SetCookieOptions) -> String {
    let mut header = format!("{name}={value}");
    if let Some(domain) = &options.domain {
        header.push_str("; Domain=");
        header.push_str(domain);
    }
    if let Some(path) = &options.path {
        header.push_str("; Path=");
        header.push_str(path);
    }
    if let Some(max_age) = options.max_age {
        header.push_str("; Max-Age=");
        header.push_str(&max_age.to_string());
    }
    if options.secure {
        header.push_str("; Secure");
    }
    if options.http_only {
        header.push_str("; HttpOnly");
    }
    if let Some(same_site) = options.same_site {
        header.push_str("; SameSite=");
        header.push_str(same_site.as_str());
    }
    header
}
