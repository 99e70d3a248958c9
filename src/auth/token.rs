//! Bearer token issuing and verification.
//!
//! Tokens are JWTs in compact serialization (`header.payload.signature`,
//! each part base64url without padding) signed with HMAC-SHA2. Only the
//! configured algorithm is accepted on verification; a token whose header
//! names any other algorithm (including `none`) is rejected before the
//! signature is looked at.

use crate::db::User;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

/// Token errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is not a three-part compact JWT")]
    Malformed,
    #[error("token segment is not valid base64url")]
    Encoding,
    #[error("token header or claims are not valid JSON")]
    Json,
    #[error("token algorithm {0} is not accepted")]
    AlgorithmMismatch(String),
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token has no subject")]
    MissingSubject,
    #[error("signing key rejected")]
    InvalidKey,
}

impl TokenError {
    /// Get a static reason string for metrics labeling.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed | Self::Encoding | Self::Json => "malformed",
            Self::AlgorithmMismatch(_) => "algorithm",
            Self::BadSignature => "signature",
            Self::Expired => "expired",
            Self::MissingSubject => "subject",
            Self::InvalidKey => "key",
        }
    }
}

/// Supported HMAC signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl FromStr for Algorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(TokenError::AlgorithmMismatch(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email.
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued-at, Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Signs and verifies bearer tokens with one shared secret.
pub struct TokenIssuer {
    key: Zeroizing<Vec<u8>>,
    algorithm: Algorithm,
    ttl_secs: i64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer for the given secret, algorithm and lifetime.
    pub fn new(secret: &str, algorithm: Algorithm, ttl_minutes: i64) -> Self {
        Self {
            key: Zeroizing::new(secret.as_bytes().to_vec()),
            algorithm,
            ttl_secs: ttl_minutes.saturating_mul(60),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Issue a token for a user, valid from now for the configured lifetime.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        self.encode(&Claims {
            sub: user.email.clone(),
            name: Some(user.name.clone()),
            iat: Some(now),
            exp: now.saturating_add(self.ttl_secs),
        })
    }

    /// Sign arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header {
            alg: self.algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
        };
        let header = serde_json::to_vec(&header).map_err(|_| TokenError::Json)?;
        let payload = serde_json::to_vec(claims).map_err(|_| TokenError::Json)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.sign(signing_input.as_bytes())?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify a token as of `now` (Unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != self.algorithm.as_str() {
            return Err(TokenError::AlgorithmMismatch(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Encoding)?;
        let signing_input_len = header_b64.len() + 1 + payload_b64.len();
        self.verify_signature(token[..signing_input_len].as_bytes(), &signature)?;

        let claims: Claims = decode_json(payload_b64)?;
        if claims.exp < now {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        Ok(claims)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, TokenError> {
        match self.algorithm {
            Algorithm::HS256 => mac::<Hmac<Sha256>>(&self.key, data),
            Algorithm::HS384 => mac::<Hmac<Sha384>>(&self.key, data),
            Algorithm::HS512 => mac::<Hmac<Sha512>>(&self.key, data),
        }
    }

    fn verify_signature(&self, data: &[u8], signature: &[u8]) -> Result<(), TokenError> {
        match self.algorithm {
            Algorithm::HS256 => verify_mac::<Hmac<Sha256>>(&self.key, data, signature),
            Algorithm::HS384 => verify_mac::<Hmac<Sha384>>(&self.key, data, signature),
            Algorithm::HS512 => verify_mac::<Hmac<Sha512>>(&self.key, data, signature),
        }
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

// verify_slice compares in constant time.
fn verify_mac<M: Mac + KeyInit>(key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), TokenError> {
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
    mac.update(data);
    mac.verify_slice(signature)
        .map_err(|_| TokenError::BadSignature)
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Encoding)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "unit-test-signing-secret-0123456789";

    fn user() -> User {
        User {
            id: 7,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            hashed_password: String::new(),
            created_at: Utc::now(),
        }
    }

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "ana@example.com".into(),
            name: None,
            iat: None,
            exp,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        let token = issuer.issue(&user()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.name.as_deref(), Some("Ana"));
        let iat = claims.iat.unwrap();
        assert_eq!(claims.exp - iat, 30 * 60);
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, i64::MAX / 60);
        let token = issuer.issue(&user()).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.exp, i64::MAX);
    }

    #[test]
    fn test_all_algorithms_verify() {
        for alg in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let issuer = TokenIssuer::new(SECRET, alg, 5);
            let token = issuer.issue(&user()).unwrap();
            assert!(issuer.verify(&token).is_ok(), "{alg}");
        }
    }

    #[test]
    fn test_known_hs256_vector() {
        let issuer = TokenIssuer::new("your-256-bit-secret", Algorithm::HS256, 30);
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
                     eyJzdWIiOiIxMjM0NTY3ODkwIiwibmFtZSI6IkpvaG4gRG9lIiwiaWF0IjoxNTE2MjM5MDIyLCJleHAiOjQxMDI0NDQ4MDB9.\
                     2rJa0xN9x5QZQTvUhAcOtrF5qH6iGAmgFeTThC4mq8o";
        let claims = issuer.verify_at(token, 1_516_239_022).unwrap();
        assert_eq!(claims.sub, "1234567890");
        assert_eq!(claims.name.as_deref(), Some("John Doe"));
        assert_eq!(claims.iat, Some(1_516_239_022));
        assert_eq!(claims.exp, 4_102_444_800);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        let other = TokenIssuer::new("another-secret-entirely-000000", Algorithm::HS256, 30);
        let token = other.issue(&user()).unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_algorithm_confusion_rejected() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        let other = TokenIssuer::new(SECRET, Algorithm::HS512, 30);
        let token = other.issue(&user()).unwrap();
        assert_eq!(
            issuer.verify(&token),
            Err(TokenError::AlgorithmMismatch("HS512".into()))
        );

        let none_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"ana@example.com","exp":99999999999}"#);
        let forged = format!("{none_header}.{payload}.");
        assert!(matches!(
            issuer.verify(&forged),
            Err(TokenError::AlgorithmMismatch(a)) if a == "none"
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        let token = issuer.issue(&user()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let evil = URL_SAFE_NO_PAD.encode(br#"{"sub":"admin@example.com","exp":99999999999}"#);
        let tampered = format!("{}.{}.{}", parts[0], evil, parts[2]);
        assert_eq!(issuer.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_expiry() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        let token = issuer.encode(&claims(1_000)).unwrap();
        assert!(issuer.verify_at(&token, 1_000).is_ok());
        assert_eq!(issuer.verify_at(&token, 1_001), Err(TokenError::Expired));
    }

    #[test]
    fn test_missing_subject_rejected() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        let mut c = claims(i64::MAX);
        c.sub.clear();
        let token = issuer.encode(&c).unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::MissingSubject));
    }

    #[test]
    fn test_malformed_tokens() {
        let issuer = TokenIssuer::new(SECRET, Algorithm::HS256, 30);
        assert_eq!(issuer.verify(""), Err(TokenError::Malformed));
        assert_eq!(issuer.verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(issuer.verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(issuer.verify("!!!.b.c"), Err(TokenError::Encoding));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("HS384".parse::<Algorithm>().unwrap(), Algorithm::HS384);
        assert!("RS256".parse::<Algorithm>().is_err());
        assert!("hs256".parse::<Algorithm>().is_err());
    }
}
