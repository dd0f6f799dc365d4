use crate::auth::AuthError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

/// Back-office account.
///
/// The password is stored as an Argon2id hash in PHC string format; the
/// optional `totp_secret` (hex-encoded) enables the second factor at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    /// Unique database identifier
    pub id: i64,
    /// Login name, unique
    pub username: String,
    /// Argon2id hash of the password in PHC string format (never plaintext)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role name used for authorization decisions ("admin", "editor", ...)
    pub role: String,
    /// Hex-encoded TOTP secret; `None` means the second factor is disabled
    #[serde(skip_serializing)]
    pub totp_secret: Option<String>,
    /// Whether the account may log in (deactivation instead of deletion)
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Timestamp of the last successful login
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminUser {
    #[must_use]
    pub fn two_factor_enabled(&self) -> bool {
        self.totp_secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Scopes granted to this account's role, embedded into issued tokens.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        match self.role.as_str() {
            "admin" => vec![
                "orders:read".to_string(),
                "orders:write".to_string(),
                "products:write".to_string(),
                "messages:read".to_string(),
            ],
            "editor" => vec!["orders:read".to_string(), "products:write".to_string()],
            _ => Vec::new(),
        }
    }
}

/// Hashes a password with Argon2id for storage.
///
/// OWASP parameters: 64 MB memory (m=65536), 3 iterations (t=3),
/// parallelism 4 (p=4), 32-byte output. The salt comes from the system
/// CSPRNG.
///
/// # Errors
/// Returns [`AuthError::PasswordHash`] if parameter construction, salt
/// generation, or hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let params = Params::new(65536, 3, 4, Some(32))
        .map_err(|e| AuthError::PasswordHash(format!("invalid Argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let rng = SystemRandom::new();
    let mut salt_bytes = [0u8; 16];
    rng.fill(&mut salt_bytes)
        .map_err(|_| AuthError::PasswordHash("salt generation failed".to_string()))?;

    let salt = SaltString::from_b64(&STANDARD_NO_PAD.encode(salt_bytes))
        .map_err(|e| AuthError::PasswordHash(format!("invalid salt encoding: {e}")))?;

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(format!("hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored Argon2id PHC hash. A hash that does
/// not parse verifies as false rather than erroring.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok()
}
