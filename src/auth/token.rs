// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Token signing and verification.
//!
//! A deployment runs in exactly one signing mode, fixed at startup:
//!
//! - HMAC (HS256) with a shared secret, or
//! - RSA (RS256) with a configured key pair.
//!
//! Verification pins the expected algorithm so a token signed with a
//! different scheme is rejected before signature checking. The library's
//! own time validation is disabled and the `exp`/`nbf` window is checked
//! manually with strict comparisons, which makes a zero-TTL token
//! deterministically expired at the instant of issuance.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::claims::{AccessClaims, StandardClaims};
use super::keys::KeyError;

/// Errors raised while signing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The presented token is the empty string.
    #[error("empty token")]
    EmptyToken,
    /// The token's expiry has passed (strict: `now >= exp`).
    #[error("token is expired")]
    Expired,
    /// The token's not-before instant is still in the future.
    #[error("token is not valid yet")]
    NotYetValid,
    /// The signature does not verify under the expected key.
    #[error("invalid token signature")]
    InvalidSignature,
    /// The token was signed with a different algorithm than this
    /// deployment uses.
    #[error("unexpected signing method")]
    UnexpectedSigningMethod,
    /// The token is structurally broken (not a JWT, bad base64, bad JSON).
    #[error("malformed token")]
    Malformed,
    /// No trusted issuer keys are configured; M2M auth fails closed.
    #[error("no trusted issuers configured")]
    NoTrustedIssuers,
    /// The token verified under none of the trusted issuer keys.
    #[error("no trusted issuer found for token")]
    NoIssuerFound,
    /// Signing failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnexpectedSigningMethod
        }
        _ => TokenError::Malformed,
    }
}

/// Pinned-algorithm validation with library time checks disabled.
fn pinned_validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims.clear();
    validation
}

/// Strict time-window check: `now >= exp` or `now < nbf` is invalid.
fn check_window(nbf: i64, exp: i64) -> Result<(), TokenError> {
    let now = Utc::now().timestamp();
    if now >= exp {
        return Err(TokenError::Expired);
    }
    if now < nbf {
        return Err(TokenError::NotYetValid);
    }
    Ok(())
}

fn decode_pinned<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<T, TokenError> {
    if token.is_empty() {
        return Err(TokenError::EmptyToken);
    }
    let data = decode::<T>(token, key, &pinned_validation(algorithm)).map_err(map_decode_error)?;
    Ok(data.claims)
}

/// The signing scheme a deployment runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// HS256 with a shared secret.
    Hmac,
    /// RS256 with a configured RSA key pair.
    Rsa,
}

impl std::fmt::Display for SigningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningMode::Hmac => f.write_str("HS256"),
            SigningMode::Rsa => f.write_str("RS256"),
        }
    }
}

/// Signs and verifies this service's own session tokens.
///
/// Holds the encoding and decoding halves for the deployment's single
/// signing mode. Construction happens once at startup.
pub struct TokenSigner {
    mode: SigningMode,
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    /// Build an HS256 signer from a shared secret.
    pub fn hmac(secret: &str) -> Self {
        Self {
            mode: SigningMode::Hmac,
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Build an RS256 signer from an RSA key pair.
    pub fn rsa(public: &RsaPublicKey, private: &RsaPrivateKey) -> Result<Self, KeyError> {
        let private_der = private
            .to_pkcs1_der()
            .map_err(|_| KeyError::UnsupportedPrivateKey)?;
        let public_der = public
            .to_pkcs1_der()
            .map_err(|e| KeyError::UnsupportedPublicKey(e.to_string()))?;
        Ok(Self {
            mode: SigningMode::Rsa,
            algorithm: Algorithm::RS256,
            encoding: EncodingKey::from_rsa_der(private_der.as_bytes()),
            decoding: DecodingKey::from_rsa_der(public_der.as_bytes()),
        })
    }

    /// The signing mode this deployment runs in.
    pub fn mode(&self) -> SigningMode {
        self.mode
    }

    /// Sign access-token claims.
    pub fn sign_access(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Sign renew-token claims.
    pub fn sign_renew(&self, claims: &StandardClaims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify an access token: signature under the deployment key, pinned
    /// algorithm, strict time window.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = decode_pinned(token, &self.decoding, self.algorithm)?;
        check_window(claims.standard.nbf, claims.standard.exp)?;
        Ok(claims)
    }

    /// Verify a renew token.
    ///
    /// Only the standard claims are checked; there is no token-kind
    /// discriminant, so an access token also passes here.
    pub fn verify_renew(&self, token: &str) -> Result<StandardClaims, TokenError> {
        let claims: StandardClaims = decode_pinned(token, &self.decoding, self.algorithm)?;
        check_window(claims.nbf, claims.exp)?;
        Ok(claims)
    }
}

/// Public keys of trusted external issuers for machine-to-machine callers.
///
/// M2M tokens are always RS256; trying each key in configuration order and
/// accepting the first that verifies keeps key rollover simple (old and new
/// key can coexist in the directory).
pub struct TrustedKeys {
    keys: Vec<DecodingKey>,
}

impl TrustedKeys {
    /// Build the trust set from loaded RSA public keys.
    pub fn from_public_keys(keys: &[RsaPublicKey]) -> Result<Self, KeyError> {
        let keys = keys
            .iter()
            .map(|key| {
                key.to_pkcs1_der()
                    .map(|der| DecodingKey::from_rsa_der(der.as_bytes()))
                    .map_err(|e| KeyError::UnsupportedPublicKey(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keys })
    }

    /// Number of trusted issuer keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no issuer keys are configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify an externally-issued token against the trust set.
    ///
    /// Fails closed when the set is empty. A token signed with anything
    /// other than RS256 is rejected without trying further keys; a token
    /// whose signature matches none of the keys yields
    /// [`TokenError::NoIssuerFound`]. The decoded claims carry the roles
    /// the issuer granted; `roles` and `azt` may be absent.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        if self.keys.is_empty() {
            return Err(TokenError::NoTrustedIssuers);
        }
        if token.is_empty() {
            return Err(TokenError::EmptyToken);
        }

        for key in &self.keys {
            match decode_pinned::<AccessClaims>(token, key, Algorithm::RS256) {
                Ok(claims) => {
                    check_window(claims.standard.nbf, claims.standard.exp)?;
                    return Ok(claims);
                }
                // Wrong key for this issuer; try the next one.
                Err(TokenError::InvalidSignature) => continue,
                // Structural and algorithm errors are the same under every
                // key, so stop immediately.
                Err(other) => return Err(other),
            }
        }
        Err(TokenError::NoIssuerFound)
    }
}
