// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! Encoded form: `pbkdf2_sha256$<iterations>$<salt b64>$<hash b64>`.
//! Verification reads the iteration count from the encoded hash, so the
//! default can be raised without invalidating stored passwords.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::{
    digest, pbkdf2,
    rand::{SecureRandom, SystemRandom},
};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

const SCHEME: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

/// Iterations used for new hashes.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("system random number generator failed")]
    Rng,
    #[error("iteration count must be positive")]
    InvalidIterations,
}

/// Hash a password with a fresh random salt and [`DEFAULT_ITERATIONS`].
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

/// Hash a password with an explicit iteration count.
pub fn hash_password_with(password: &str, iterations: u32) -> Result<String, PasswordError> {
    let rounds = NonZeroU32::new(iterations).ok_or(PasswordError::InvalidIterations)?;

    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| PasswordError::Rng)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, rounds, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        Base64::encode_string(&salt),
        Base64::encode_string(&hash)
    ))
}

/// Verify a password against an encoded hash in constant time.
///
/// Malformed encodings never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Some(rounds) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (Base64::decode_vec(salt), Base64::decode_vec(hash)) else {
        return false;
    };

    pbkdf2::verify(ALGORITHM, rounds, &salt, password.as_bytes(), &hash).is_ok()
}
