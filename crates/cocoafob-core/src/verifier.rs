//! Registration key verification for the shipped application.
//!
//! Name and key text come from the user and must be treated as hostile.
//! Every failure (empty name, undecodable text, malformed signature, wrong
//! signer) collapses into `false` so the host never crashes or branches on
//! the kind of failure. Only key loading can fail loudly, and that happens
//! once at startup with vendor-supplied PEM.

use crate::codec::{decode_with, KeyFormat};
use crate::error::LicenseResult;
use crate::key_material::{PublicVerifyingKey, VerifyingCapability};

/// Check that `registration_key` was issued for `name`.
///
/// Accepts the canonical text format, tolerating case, whitespace and `O`/`I`
/// typed for `8`/`9`. Never panics on any input.
#[must_use]
pub fn verify<K>(key: &K, name: &str, registration_key: &str) -> bool
where
    K: VerifyingCapability + ?Sized,
{
    verify_with(key, name, registration_key, &KeyFormat::default())
}

/// Check a registration key written with a custom [`KeyFormat`].
#[must_use]
pub fn verify_with<K>(
    key: &K,
    name: &str,
    registration_key: &str,
    format: &KeyFormat,
) -> bool
where
    K: VerifyingCapability + ?Sized,
{
    if name.is_empty() {
        tracing::debug!("registration rejected: empty name");
        return false;
    }

    let signature = match decode_with(registration_key, format) {
        Ok(signature) => signature,
        Err(e) => {
            tracing::debug!(key_len = registration_key.len(), "registration rejected: {e}");
            return false;
        }
    };

    match key.verify(name.as_bytes(), &signature) {
        Ok(valid) => {
            if !valid {
                tracing::debug!("registration rejected: signature mismatch");
            }
            valid
        }
        Err(e) => {
            tracing::debug!("registration rejected: {e}");
            false
        }
    }
}

/// Owns a public key for the lifetime of the verifying application.
#[derive(Clone, Debug)]
pub struct KeyVerifier<K = PublicVerifyingKey> {
    key: K,
    format: KeyFormat,
}

impl KeyVerifier<PublicVerifyingKey> {
    /// Load a PEM-encoded DSA public key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LicenseError::InvalidKey`] if the key cannot be
    /// loaded.
    pub fn from_pem(pem: &[u8]) -> LicenseResult<Self> {
        PublicVerifyingKey::from_pem(pem).map(Self::new)
    }
}

impl<K: VerifyingCapability> KeyVerifier<K> {
    /// Wrap a verifying capability, using the canonical key format.
    pub fn new(key: K) -> Self {
        Self {
            key,
            format: KeyFormat::default(),
        }
    }

    /// Use a custom key format.
    #[must_use]
    pub fn with_format(mut self, format: KeyFormat) -> Self {
        self.format = format;
        self
    }

    /// Check that `registration_key` was issued for `name`.
    #[must_use]
    pub fn verify(&self, name: &str, registration_key: &str) -> bool {
        verify_with(&self.key, name, registration_key, &self.format)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawSignature;
    use crate::error::LicenseError;

    /// Verifying backend with a scripted answer.
    struct ScriptedVerifier(fn(&RawSignature) -> LicenseResult<bool>);

    impl VerifyingCapability for ScriptedVerifier {
        fn verify(&self, _message: &[u8], signature: &RawSignature) -> LicenseResult<bool> {
            (self.0)(signature)
        }
    }

    #[test]
    fn empty_name_is_false() {
        let verifier = ScriptedVerifier(|_| Ok(true));
        assert!(!verify(&verifier, "", "NBSWY-3DP"));
    }

    #[test]
    fn malformed_text_is_false_without_calling_backend() {
        let verifier = ScriptedVerifier(|_| panic!("backend must not be called"));
        assert!(!verify(&verifier, "Joe Bloggs", "not a key!"));
        assert!(!verify(&verifier, "Joe Bloggs", ""));
        assert!(!verify(&verifier, "Joe Bloggs", "A"));
    }

    #[test]
    fn backend_error_is_false() {
        let verifier =
            ScriptedVerifier(|_| Err(LicenseError::VerificationError("bad DER".to_owned())));
        assert!(!verify(&verifier, "Joe Bloggs", "NBSWY-3DP"));
    }

    #[test]
    fn backend_answer_passes_through() {
        let accept = ScriptedVerifier(|sig| Ok(sig.as_bytes() == b"hello"));
        assert!(verify(&accept, "Joe Bloggs", "NBSWY-3DP"));
        assert!(verify(&accept, "Joe Bloggs", " nbswy 3dp "));
        assert!(!verify(&accept, "Joe Bloggs", "NBSWY-3DQ"));
    }

    #[test]
    fn custom_format_separator_is_stripped() {
        let format = KeyFormat::new(4, '.', true).unwrap();
        let backend = ScriptedVerifier(|sig| Ok(sig.as_bytes() == b"hello"));
        let verifier = KeyVerifier::new(backend).with_format(format);
        assert!(verifier.verify("Joe Bloggs", "NBSW.Y3DP"));
    }
}
