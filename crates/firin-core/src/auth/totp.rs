//! Time-based one-time passwords (RFC 6238) for the admin second factor.
//!
//! Standard parameters: HMAC-SHA1, 30-second step, 6 digits, one step of
//! clock skew accepted in both directions. Secrets are stored hex-encoded.

use ring::hmac;
use subtle::ConstantTimeEq;

const STEP_SECONDS: i64 = 30;
const DIGITS: u32 = 6;
const SKEW_STEPS: i64 = 1;

/// Computes the TOTP code for a raw secret at a unix timestamp.
#[must_use]
pub fn code_at(secret: &[u8], timestamp: i64) -> u32 {
    let counter = (timestamp / STEP_SECONDS).max(0);
    hotp(secret, u64::try_from(counter).unwrap_or(0))
}

/// HOTP (RFC 4226) with dynamic truncation.
fn hotp(secret: &[u8], counter: u64) -> u32 {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret);
    let tag = hmac::sign(&key, &counter.to_be_bytes());
    let bytes = tag.as_ref();

    let offset = (bytes[bytes.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(bytes[offset] & 0x7f) << 24) |
        (u32::from(bytes[offset + 1]) << 16) |
        (u32::from(bytes[offset + 2]) << 8) |
        u32::from(bytes[offset + 3]);

    binary % 10u32.pow(DIGITS)
}

/// Verifies a submitted code against a hex-encoded secret, allowing
/// `SKEW_STEPS` steps of clock drift. Comparison is constant-time.
///
/// Malformed secrets and codes verify as false; the caller treats that as an
/// invalid code, not an error.
#[must_use]
pub fn verify(secret_hex: &str, code: &str, timestamp: i64) -> bool {
    let Ok(secret) = hex::decode(secret_hex) else {
        return false;
    };
    if secret.is_empty() {
        return false;
    }

    let code = code.trim();
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let mut matched = false;
    for step in -SKEW_STEPS..=SKEW_STEPS {
        let expected = format!(
            "{:01$}",
            code_at(&secret, timestamp + step * STEP_SECONDS),
            DIGITS as usize
        );
        matched |= bool::from(expected.as_bytes().ct_eq(code.as_bytes()));
    }
    matched
}
