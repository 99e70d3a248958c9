//! Registration, login and bearer token authentication.

use super::email::{is_valid_email, normalize_email};
use super::token::{TokenError, TokenIssuer};
use crate::db::{DbError, User, UserStore};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::password;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Longest accepted password, in bytes.
const MAX_PASSWORD_LEN: usize = 1024;

/// Longest accepted display name, in characters.
const MAX_NAME_LEN: usize = 255;

/// Body of `POST /registrar`.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub senha: String,
}

/// Body of `POST /login`.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginRequest {
    pub email: String,
    pub senha: String,
}

/// Body returned by both credential endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub jwt: String,
}

/// Account operations over a [`UserStore`].
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new user and return a token for them.
    pub async fn register(&self, req: &RegisterRequest) -> ApiResult<TokenResponse> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(ApiError::Validation(
                "name must not contain control characters".into(),
            ));
        }
        let email = validated_email(&req.email)?;
        validate_password(&req.senha)?;

        if self.users.find_by_email(&email).await?.is_some() {
            debug!(email = %email, "Registration rejected, email taken");
            return Err(ApiError::EmailTaken);
        }

        let plain = Zeroizing::new(req.senha.clone());
        let hashed = tokio::task::spawn_blocking(move || password::hash_password(&plain))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))??;

        let user = match self.users.create_user(name, &email, &hashed).await {
            Ok(user) => user,
            Err(DbError::EmailExists(_)) => return Err(ApiError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        metrics::record_registration();
        info!(user_id = user.id, "User registered");
        self.token_for(&user)
    }

    /// Check credentials and return a token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller,
    /// in both body and timing.
    pub async fn login(&self, req: &LoginRequest) -> ApiResult<TokenResponse> {
        let email = validated_email(&req.email)?;
        validate_password(&req.senha)?;

        let user = self.users.find_by_email(&email).await?;
        let plain = Zeroizing::new(req.senha.clone());
        let (user, verified) = tokio::task::spawn_blocking(move || match user {
            Some(user) => {
                let verified = password::verify_password(&plain, &user.hashed_password);
                (Some(user), verified)
            }
            None => {
                password::dummy_verify(&plain);
                (None, Ok(false))
            }
        })
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;

        match (user, verified) {
            (Some(user), Ok(true)) => {
                info!(user_id = user.id, "User logged in");
                self.token_for(&user)
            }
            (user, verified) => {
                if let Err(e) = verified {
                    warn!(user_id = ?user.map(|u| u.id), error = %e, "Stored password hash is unreadable");
                }
                metrics::record_login_failure();
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> ApiResult<User> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            reject(e.reason())
        })?;

        match self.users.find_by_email(&claims.sub).await? {
            Some(user) => Ok(user),
            None => Err(reject("unknown_user")),
        }
    }

    fn token_for(&self, user: &User) -> ApiResult<TokenResponse> {
        let jwt = self
            .tokens
            .issue(user)
            .map_err(|e: TokenError| ApiError::Internal(format!("token signing failed: {e}")))?;
        Ok(TokenResponse { jwt })
    }
}

/// Count a rejected token and build the error for it.
pub fn reject(reason: &'static str) -> ApiError {
    metrics::record_auth_rejected(reason);
    ApiError::Forbidden(reason)
}

fn validated_email(raw: &str) -> ApiResult<String> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::Validation(
            "value is not a valid email address".into(),
        ));
    }
    Ok(email)
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.is_empty() {
        return Err(ApiError::Validation("senha must not be empty".into()));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "senha must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(())
}
