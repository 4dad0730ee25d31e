// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Key material loading and format negotiation.
//!
//! Signing and verification keys arrive as PEM blocks, either inline in the
//! configuration or as file paths ("value-or-file" policy). Private keys may
//! be PKCS#1 or PKCS#8; public keys may be raw PKCS#1 RSA keys or X.509
//! certificates wrapping an RSA subject public key. Only RSA is accepted.
//!
//! All loading happens once at startup; a malformed configured key is fatal.
//! The trusted-keys directory is the one exception: unparseable files there
//! are skipped with a warning so a partial trust store still loads.

use std::path::Path;

use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    RsaPrivateKey, RsaPublicKey,
};
use thiserror::Error;
use tracing::{info, warn};
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

/// Errors raised while decoding configured key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The input did not contain a PEM block.
    #[error("key material is not in PEM format")]
    NotPem,
    /// The private key is neither a PKCS#1 nor a PKCS#8 RSA key.
    #[error("private key is neither PKCS#1 nor PKCS#8 RSA")]
    UnsupportedPrivateKey,
    /// The public key failed to parse as the declared structure.
    #[error("public key error: {0}")]
    UnsupportedPublicKey(String),
    /// The certificate parsed, but its subject public key is not RSA.
    #[error("certificate does not contain an RSA public key: {0}")]
    NotRsaCertificate(String),
    /// A configured key path exists but could not be read.
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve configured key material to its DER payload.
///
/// If `value_or_path` names an existing file, the file contents are used
/// verbatim; otherwise the string itself is treated as the PEM block.
pub fn read_key_material(value_or_path: &str) -> Result<Vec<u8>, KeyError> {
    let pem_bytes = if Path::new(value_or_path).is_file() {
        std::fs::read(value_or_path).map_err(|source| KeyError::Io {
            path: value_or_path.to_string(),
            source,
        })?
    } else {
        // Not a file: the value itself is the PEM content.
        value_or_path.as_bytes().to_vec()
    };

    let block = pem::parse(pem_bytes).map_err(|_| KeyError::NotPem)?;
    Ok(block.contents().to_vec())
}

/// Report whether the DER payload is an X.509 certificate.
///
/// Used upstream to pick the public-key parsing branch and to log which
/// format was detected. Never fails.
pub fn is_certificate(der: &[u8]) -> bool {
    Certificate::from_der(der).is_ok()
}

/// Parse an RSA private key from DER, trying PKCS#1 first and falling back
/// to PKCS#8. A PKCS#8 payload wrapping a non-RSA key is rejected.
pub fn parse_private_key(der: &[u8]) -> Result<RsaPrivateKey, KeyError> {
    if let Ok(key) = RsaPrivateKey::from_pkcs1_der(der) {
        return Ok(key);
    }
    RsaPrivateKey::from_pkcs8_der(der).map_err(|_| KeyError::UnsupportedPrivateKey)
}

/// Parse an RSA public key from DER.
///
/// When `certificate` is true the payload must be an X.509 certificate
/// whose subject public key is RSA; otherwise it must be a raw PKCS#1 RSA
/// public key.
pub fn parse_public_key(der: &[u8], certificate: bool) -> Result<RsaPublicKey, KeyError> {
    if certificate {
        let cert = Certificate::from_der(der)
            .map_err(|e| KeyError::UnsupportedPublicKey(e.to_string()))?;
        let spki_der = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| KeyError::NotRsaCertificate(e.to_string()))?;
        RsaPublicKey::from_public_key_der(&spki_der)
            .map_err(|e| KeyError::NotRsaCertificate(e.to_string()))
    } else {
        RsaPublicKey::from_pkcs1_der(der)
            .map_err(|e| KeyError::UnsupportedPublicKey(e.to_string()))
    }
}

/// Parse a verification/signing key pair from DER payloads.
///
/// `certificate` declares whether the public half is an X.509 certificate.
pub fn read_key_pair(
    pub_der: &[u8],
    pvt_der: &[u8],
    certificate: bool,
) -> Result<(RsaPublicKey, RsaPrivateKey), KeyError> {
    let public = parse_public_key(pub_der, certificate)?;
    let private = parse_private_key(pvt_der)?;
    Ok((public, private))
}

/// Load the trusted public keys for machine-to-machine callers.
///
/// Enumerates regular files under `dir` (subdirectories are skipped) and
/// parses each as a PEM-armored PKIX public key. Files that fail to decode
/// are skipped with a warning; a missing or empty directory yields an empty
/// set, in which case all M2M authentication fails closed.
pub fn load_trusted_keys(dir: &Path) -> Vec<RsaPublicKey> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to read trusted keys dir");
            return Vec::new();
        }
    };

    let mut keys = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        info!(path = %path.display(), "reading trusted public key");

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read key file");
                continue;
            }
        };
        let block = match pem::parse(data) {
            Ok(block) => block,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "invalid key");
                continue;
            }
        };
        match RsaPublicKey::from_public_key_der(block.contents()) {
            Ok(key) => keys.push(key),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse key data");
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CERT_PEM: &str = include_str!("../../testdata/test_cert.pem");
    const PKCS1_KEY_PEM: &str = include_str!("../../testdata/test_key_pkcs1.pem");
    const PKCS8_KEY_PEM: &str = include_str!("../../testdata/test_key_pkcs8.pem");
    const PKIX_PUB_PEM: &str = include_str!("../../testdata/test_pub_pkix.pem");
    const PKCS1_PUB_PEM: &str = include_str!("../../testdata/test_pub_pkcs1.pem");
    const ED25519_KEY_PEM: &str = include_str!("../../testdata/test_key_ed25519.pem");

    fn der(pem_str: &str) -> Vec<u8> {
        read_key_material(pem_str).unwrap()
    }

    #[test]
    fn key_material_from_literal_pem() {
        let payload = read_key_material(PKCS1_KEY_PEM).unwrap();
        assert!(!payload.is_empty());
    }

    #[test]
    fn key_material_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PKCS1_KEY_PEM.as_bytes()).unwrap();

        let from_file = read_key_material(file.path().to_str().unwrap()).unwrap();
        assert_eq!(from_file, read_key_material(PKCS1_KEY_PEM).unwrap());
    }

    #[test]
    fn key_material_rejects_non_pem() {
        assert!(matches!(
            read_key_material("definitely not a key"),
            Err(KeyError::NotPem)
        ));
    }

    #[test]
    fn private_key_parses_pkcs1_and_pkcs8() {
        let pkcs1 = parse_private_key(&der(PKCS1_KEY_PEM)).unwrap();
        let pkcs8 = parse_private_key(&der(PKCS8_KEY_PEM)).unwrap();
        // Same underlying key in both encodings.
        assert_eq!(
            RsaPublicKey::from(&pkcs1),
            RsaPublicKey::from(&pkcs8)
        );
    }

    #[test]
    fn private_key_rejects_non_rsa_pkcs8() {
        let err = parse_private_key(&der(ED25519_KEY_PEM)).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedPrivateKey));
    }

    #[test]
    fn certificate_detection() {
        assert!(is_certificate(&der(CERT_PEM)));
        assert!(!is_certificate(&der(PKCS1_KEY_PEM)));
        assert!(!is_certificate(&der(PKCS8_KEY_PEM)));
    }

    #[test]
    fn public_key_from_certificate() {
        let public = parse_public_key(&der(CERT_PEM), true).unwrap();
        let private = parse_private_key(&der(PKCS8_KEY_PEM)).unwrap();
        assert_eq!(public, RsaPublicKey::from(&private));
    }

    #[test]
    fn public_key_from_raw_pkcs1() {
        let public = parse_public_key(&der(PKCS1_PUB_PEM), false).unwrap();
        let private = parse_private_key(&der(PKCS1_KEY_PEM)).unwrap();
        assert_eq!(public, RsaPublicKey::from(&private));
    }

    #[test]
    fn pkix_public_key_is_not_a_pkcs1_key() {
        // A PKIX (SubjectPublicKeyInfo) blob must not parse through the raw
        // PKCS#1 branch.
        let err = parse_public_key(&der(PKIX_PUB_PEM), false).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedPublicKey(_)));
    }

    #[test]
    fn key_pair_from_certificate_and_pkcs8() {
        let (public, private) =
            read_key_pair(&der(CERT_PEM), &der(PKCS8_KEY_PEM), true).unwrap();
        assert_eq!(public, RsaPublicKey::from(&private));
    }

    #[test]
    fn trusted_keys_skip_bad_files_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.pem"), PKIX_PUB_PEM).unwrap();
        std::fs::write(dir.path().join("garbage.pem"), "not a key").unwrap();
        // Raw PKCS#1 public keys are not PKIX and are skipped too.
        std::fs::write(dir.path().join("pkcs1.pem"), PKCS1_PUB_PEM).unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let keys = load_trusted_keys(dir.path());
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn trusted_keys_missing_dir_is_empty() {
        let keys = load_trusted_keys(Path::new("/nonexistent/pubkeys"));
        assert!(keys.is_empty());
    }
}
