// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Password policy and hashing.
//!
//! Hashes use Argon2id via the `password_hash` PHC string format, so the
//! salt and parameters travel inside the stored hash and verification
//! needs no extra state.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A password policy violation, phrased for the API caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain a special character")]
    MissingSpecial,
}

/// Check a candidate password against the policy: at least eight
/// characters with lowercase, uppercase, digit and special classes all
/// present.
pub fn validate_password(password: &str) -> Result<(), PolicyError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PolicyError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::MissingDigit);
    }
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Err(PolicyError::MissingSpecial);
    }
    Ok(())
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a candidate password against a stored PHC hash string.
///
/// An unparseable stored hash counts as a mismatch rather than an error;
/// login must not leak storage problems to the caller.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
