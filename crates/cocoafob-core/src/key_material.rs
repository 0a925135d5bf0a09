//! DSA key material behind sign/verify capabilities.
//!
//! This module provides:
//! - [`PrivateSigningKey`] — vendor-side key, loaded from PEM, can only sign
//! - [`PublicVerifyingKey`] — application-side key, loaded from PEM, can only verify
//! - [`sign`] / [`verify`] — SHA-1 digest + DSA, signatures DER-encoded
//! - [`SigningCapability`] / [`VerifyingCapability`] — the seam the generator
//!   and verifier depend on
//!
//! # Accepted PEM encodings
//!
//! | Label              | Structure                                   |
//! |--------------------|---------------------------------------------|
//! | `DSA PRIVATE KEY`  | OpenSSL traditional `SEQUENCE {0, p, q, g, y, x}` |
//! | `PRIVATE KEY`      | PKCS#8 `PrivateKeyInfo` with the DSA OID    |
//! | `PUBLIC KEY`       | X.509 `SubjectPublicKeyInfo` with the DSA OID |
//!
//! # Nonces
//!
//! DSA nonces are derived per RFC 6979 from the key and the SHA-1 digest, so
//! the backend does not depend on a CSPRNG at signing time. Callers must
//! still treat signatures as non-reproducible: keys produced by other
//! CocoaFob-compatible generators use random nonces.

use std::fmt;

use der::asn1::UintRef;
use der::{Decode, Sequence};
use dsa::signature::{DigestSigner, DigestVerifier, SignatureEncoding};
use dsa::{BigUint, Components, SigningKey, VerifyingKey};
use pkcs8::spki::DecodePublicKey;
use pkcs8::DecodePrivateKey;
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::codec::RawSignature;
use crate::error::{LicenseError, LicenseResult};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// PEM label of OpenSSL's traditional DSA private key encoding.
pub const PEM_LABEL_DSA_PRIVATE_KEY: &str = "DSA PRIVATE KEY";

/// PEM label of a PKCS#8 private key.
pub const PEM_LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";

/// PEM label of an X.509 `SubjectPublicKeyInfo`.
pub const PEM_LABEL_PUBLIC_KEY: &str = "PUBLIC KEY";

/// Closing line of the parameter block `openssl dsaparam -genkey` writes
/// ahead of the key.
const PEM_DSA_PARAMETERS_END: &str = "-----END DSA PARAMETERS-----";

/// Version field of the traditional DSA private key structure.
const TRADITIONAL_DSA_VERSION: u8 = 0;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Something that can sign a message for a registration key.
pub trait SigningCapability: Send + Sync {
    /// Digest `message` and sign the digest.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::SigningFailed`] on backend failure.
    fn sign(&self, message: &[u8]) -> LicenseResult<RawSignature>;
}

/// Something that can check a registration key signature.
pub trait VerifyingCapability: Send + Sync {
    /// Digest `message` and check `signature` against it.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not match.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::VerificationError`] if `signature` is not
    /// structurally decodable.
    fn verify(&self, message: &[u8], signature: &RawSignature) -> LicenseResult<bool>;
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// DSA private key used to generate registration keys.
///
/// Immutable once loaded. The private scalar is wiped when the key is
/// dropped, so scope the handle to the generating operation. This type
/// intentionally exposes neither the key bytes nor `Serialize`.
pub struct PrivateSigningKey {
    inner: SigningKey,
}

impl fmt::Debug for PrivateSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateSigningKey(***)")
    }
}

/// DSA public key used to check registration keys.
#[derive(Clone)]
pub struct PublicVerifyingKey {
    inner: VerifyingKey,
}

impl fmt::Debug for PublicVerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicVerifyingKey")
            .field("p_bits", &self.inner.components().p().bits())
            .field("q_bits", &self.inner.components().q().bits())
            .finish_non_exhaustive()
    }
}

/// OpenSSL traditional DSA private key (`DSA PRIVATE KEY`).
#[derive(Sequence)]
struct TraditionalDsaPrivateKey<'a> {
    version: u8,
    p: UintRef<'a>,
    q: UintRef<'a>,
    g: UintRef<'a>,
    y: UintRef<'a>,
    x: UintRef<'a>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl PrivateSigningKey {
    /// Parse a PEM-encoded DSA private key.
    ///
    /// Both the OpenSSL traditional encoding and PKCS#8 are accepted. A
    /// leading `DSA PARAMETERS` block is skipped. The decoded DER buffer is
    /// zeroized before returning.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKey`] if the PEM armor is broken, the
    /// label is not a private key label, the DER does not parse, the key is
    /// not DSA, or the DSA components are inconsistent.
    pub fn from_pem(pem: &[u8]) -> LicenseResult<Self> {
        let text = std::str::from_utf8(pem)
            .map_err(|_| LicenseError::InvalidKey("PEM is not valid UTF-8".to_owned()))?;
        let key_block = text
            .split_once(PEM_DSA_PARAMETERS_END)
            .map_or(text, |(_, rest)| rest);
        let (label, der) = decode_pem(key_block.as_bytes())?;

        let inner = match label.as_str() {
            PEM_LABEL_DSA_PRIVATE_KEY => signing_key_from_traditional(&der)?,
            PEM_LABEL_PRIVATE_KEY => SigningKey::from_pkcs8_der(&der)
                .map_err(|e| LicenseError::InvalidKey(format!("PKCS#8 DSA key: {e}")))?,
            other => {
                return Err(LicenseError::InvalidKey(format!(
                    "unexpected PEM label {other:?}, expected {PEM_LABEL_DSA_PRIVATE_KEY:?} or {PEM_LABEL_PRIVATE_KEY:?}"
                )))
            }
        };

        tracing::debug!(
            encoding = %label,
            p_bits = inner.verifying_key().components().p().bits(),
            "loaded DSA private key"
        );
        Ok(Self { inner })
    }

    /// Public half of this key.
    #[must_use]
    pub fn verifying_key(&self) -> PublicVerifyingKey {
        PublicVerifyingKey {
            inner: self.inner.verifying_key().clone(),
        }
    }
}

impl PublicVerifyingKey {
    /// Parse a PEM-encoded DSA public key (`PUBLIC KEY`).
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKey`] if the PEM armor is broken, the
    /// label is not `PUBLIC KEY`, or the key is not DSA.
    pub fn from_pem(pem: &[u8]) -> LicenseResult<Self> {
        let (label, der) = decode_pem(pem)?;
        if label != PEM_LABEL_PUBLIC_KEY {
            return Err(LicenseError::InvalidKey(format!(
                "unexpected PEM label {label:?}, expected {PEM_LABEL_PUBLIC_KEY:?}"
            )));
        }

        let inner = VerifyingKey::from_public_key_der(&der)
            .map_err(|e| LicenseError::InvalidKey(format!("DSA public key: {e}")))?;
        Ok(Self { inner })
    }
}

/// Strip PEM armor. Returns the label and the DER body.
fn decode_pem(pem: &[u8]) -> LicenseResult<(String, Zeroizing<Vec<u8>>)> {
    let (label, der) = pem_rfc7468::decode_vec(pem.trim_ascii())
        .map_err(|e| LicenseError::InvalidKey(format!("PEM decoding failed: {e}")))?;
    Ok((label.to_owned(), Zeroizing::new(der)))
}

fn signing_key_from_traditional(der: &[u8]) -> LicenseResult<SigningKey> {
    let key = TraditionalDsaPrivateKey::from_der(der)
        .map_err(|e| LicenseError::InvalidKey(format!("traditional DSA key: {e}")))?;

    if key.version != TRADITIONAL_DSA_VERSION {
        return Err(LicenseError::InvalidKey(format!(
            "unsupported DSA key version {}",
            key.version
        )));
    }

    let (p, q, g) = (to_biguint(key.p), to_biguint(key.q), to_biguint(key.g));
    let y = to_biguint(key.y);
    let x = Zeroizing::new(to_biguint(key.x));

    let components = Components::from_components(p, q, g)
        .map_err(|_| LicenseError::InvalidKey("invalid DSA domain parameters".to_owned()))?;

    // y = g^x mod p, otherwise every signature would fail to verify.
    if components.g().modpow(&x, components.p()) != y {
        return Err(LicenseError::InvalidKey(
            "public value does not match private value".to_owned(),
        ));
    }

    let verifying_key = VerifyingKey::from_components(components, y)
        .map_err(|_| LicenseError::InvalidKey("invalid DSA public value".to_owned()))?;
    SigningKey::from_components(verifying_key, (*x).clone())
        .map_err(|_| LicenseError::InvalidKey("invalid DSA private value".to_owned()))
}

fn to_biguint(value: UintRef<'_>) -> BigUint {
    BigUint::from_bytes_be(value.as_bytes())
}

// ---------------------------------------------------------------------------
// Sign / verify
// ---------------------------------------------------------------------------

/// Sign the SHA-1 digest of `message`. Returns the DER-encoded `(r, s)` pair.
///
/// # Errors
///
/// Returns [`LicenseError::SigningFailed`] if the backend fails. The backend
/// error carries no diagnostic, so the detail is always `None`.
pub fn sign(key: &PrivateSigningKey, message: &[u8]) -> LicenseResult<RawSignature> {
    let signature: dsa::Signature = key
        .inner
        .try_sign_digest(Sha1::new_with_prefix(message))
        .map_err(|_| LicenseError::SigningFailed(None))?;
    Ok(RawSignature::new(signature.to_vec()))
}

/// Check a DER-encoded DSA signature over the SHA-1 digest of `message`.
///
/// # Errors
///
/// Returns [`LicenseError::VerificationError`] if `signature` is not a DER
/// `(r, s)` pair. A well-formed signature that does not match is `Ok(false)`.
pub fn verify(
    key: &PublicVerifyingKey,
    message: &[u8],
    signature: &RawSignature,
) -> LicenseResult<bool> {
    let signature = dsa::Signature::try_from(signature.as_bytes()).map_err(|_| {
        LicenseError::VerificationError("signature is not a DER (r, s) pair".to_owned())
    })?;
    Ok(key
        .inner
        .verify_digest(Sha1::new_with_prefix(message), &signature)
        .is_ok())
}

impl SigningCapability for PrivateSigningKey {
    fn sign(&self, message: &[u8]) -> LicenseResult<RawSignature> {
        sign(self, message)
    }
}

impl VerifyingCapability for PublicVerifyingKey {
    fn verify(&self, message: &[u8], signature: &RawSignature) -> LicenseResult<bool> {
        verify(self, message, signature)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
