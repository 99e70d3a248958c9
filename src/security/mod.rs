//! Security module for bovespa-api.
//!
//! Provides core security features:
//! - **Password hashing**: Argon2 for new hashes, bcrypt accepted for legacy rows
//! - **Rate Limiting**: Governor-based brute-force protection for credential endpoints
//! - **Secret checks**: Refuse predictable token signing secrets at startup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 Security Module                 │
//! ├────────────────┬─────────────────┬──────────────┤
//! │   Password     │  Rate Limiting  │   Secrets    │
//! │ Argon2/bcrypt  │    Governor     │ weak-secret  │
//! │ dummy verify   │  per-IP bucket  │   detection  │
//! └────────────────┴─────────────────┴──────────────┘
//! ```

pub mod password;
pub mod rate_limit;

pub use rate_limit::AuthRateLimiter;

/// Check if a signing secret is weak or a well-known default.
///
/// Used at startup to refuse running with a guessable `JWT_SECRET_KEY`,
/// which would let anyone mint valid tokens.
pub fn is_weak_secret(secret: &str) -> bool {
    let lower = secret.to_ascii_lowercase();
    secret.len() < 16
        || lower.contains("changeme")
        || lower.contains("troque")
        || lower.contains("default")
        || lower.contains("segredo")
        || lower.contains("secret_key")
}
