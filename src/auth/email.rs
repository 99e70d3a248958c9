//! Email address validation and normalization.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of an address (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// Check that an address is syntactically valid.
///
/// Requires a dotted domain and rejects leading, trailing or doubled dots in
/// the local part.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(email) {
        return false;
    }
    let Some((local, _)) = email.rsplit_once('@') else {
        return false;
    };
    local.len() <= 64 && !local.starts_with('.') && !local.ends_with('.') && !local.contains("..")
}

/// Normalize an address for storage and lookup.
///
/// Surrounding whitespace is dropped and the domain is lower-cased; the
/// local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}
