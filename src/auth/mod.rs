//! User authentication.
//!
//! - [`token`]: JWT issuing and verification
//! - [`email`]: address validation and normalization
//! - [`service`]: registration and login on top of the user store
//! - [`extractor`]: the `AuthUser` request extractor for protected routes

pub mod email;
pub mod extractor;
pub mod service;
pub mod token;

pub use extractor::AuthUser;
pub use service::{AuthService, LoginRequest, RegisterRequest, TokenResponse};
pub use token::{Algorithm, TokenIssuer};
