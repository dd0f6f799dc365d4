//! Admin-account authentication: credentials, sessions, and the second
//! factor.
//!
//! Two credential kinds converge on one authenticated identity
//! ([`crate::principal::Principal`]): the admin panel presents a session
//! cookie, the API presents a bearer token. This module owns the account
//! model and storage; token mechanics live in [`crate::token`] and the
//! strategy selection in [`crate::principal`].
//!
//! Passwords are stored as Argon2id PHC strings (64 MB memory, 3 iterations,
//! parallelism 4) and never in plaintext. Session lookups go through a
//! SHA-256 blind index so the raw session id never appears in the database.

pub mod repository;
pub mod session;
pub mod totp;
pub mod user;

use crate::error::{AppError, HttpError};
use thiserror::Error;

/// Error types for admin authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately one variant: the
    /// response must not reveal which half failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account has a TOTP secret and no (or an empty) code was supplied.
    #[error("two-factor code required")]
    TwoFactorRequired,

    #[error("invalid two-factor code")]
    InvalidTwoFactorCode,

    /// The account exists but has been deactivated.
    #[error("account inactive")]
    InactiveAccount,

    /// The session cookie does not resolve to an active session.
    #[error("invalid session")]
    InvalidSession,

    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials |
            AuthError::TwoFactorRequired |
            AuthError::InvalidTwoFactorCode |
            AuthError::InvalidSession => Self::Http(HttpError::unauthorized(err.to_string())),
            AuthError::InactiveAccount => Self::Http(HttpError::forbidden(err.to_string())),
            AuthError::PasswordHash(_) | AuthError::DatabaseError(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
