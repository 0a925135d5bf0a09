//! Registration key generation: name → SHA-1 → DSA → Base32 text.
//!
//! Generation errors reach the caller unchanged; there is no safe default
//! for a key that could not be made. Nothing is retried here. A caller may
//! retry the whole operation.

use crate::codec::{encode_with, KeyFormat, RegistrationKey};
use crate::error::{LicenseError, LicenseResult};
use crate::key_material::{PrivateSigningKey, SigningCapability};

/// Generate the registration key for `name` in the canonical format.
///
/// `name` is signed as its exact UTF-8 bytes. The verifier must see the
/// byte-identical string, including case and Unicode normalization.
///
/// Two calls for the same name are not guaranteed to produce the same text;
/// every result verifies.
///
/// # Errors
///
/// - [`LicenseError::InvalidName`] if `name` is empty
/// - [`LicenseError::SigningFailed`] if the signing backend fails
/// - [`LicenseError::KeyGenerationFailed`] if the backend signs to nothing
pub fn generate<K>(key: &K, name: &str) -> LicenseResult<RegistrationKey>
where
    K: SigningCapability + ?Sized,
{
    generate_with(key, name, &KeyFormat::default())
}

/// Generate the registration key for `name` using a custom [`KeyFormat`].
///
/// # Errors
///
/// See [`generate`].
pub fn generate_with<K>(
    key: &K,
    name: &str,
    format: &KeyFormat,
) -> LicenseResult<RegistrationKey>
where
    K: SigningCapability + ?Sized,
{
    if name.is_empty() {
        return Err(LicenseError::InvalidName("name must not be empty".to_owned()));
    }

    let signature = key.sign(name.as_bytes()).inspect_err(|e| {
        tracing::warn!("registration key signing failed: {e}");
    })?;

    if signature.is_empty() {
        tracing::warn!("signing backend returned an empty signature");
        return Err(LicenseError::KeyGenerationFailed);
    }

    let registration_key = encode_with(signature.as_bytes(), format);
    tracing::debug!(
        name_len = name.len(),
        signature_len = signature.len(),
        key_len = registration_key.as_str().len(),
        "generated registration key"
    );
    Ok(registration_key)
}

/// Owns a signing key for the duration of a generation session.
///
/// Dropping the generator drops the key, which wipes the private scalar.
pub struct KeyGenerator<K = PrivateSigningKey> {
    key: K,
    format: KeyFormat,
}

impl KeyGenerator<PrivateSigningKey> {
    /// Load a PEM-encoded DSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKey`] if the key cannot be loaded.
    pub fn from_pem(pem: &[u8]) -> LicenseResult<Self> {
        PrivateSigningKey::from_pem(pem).map(Self::new)
    }
}

impl<K: SigningCapability> KeyGenerator<K> {
    /// Wrap a signing capability, using the canonical key format.
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

    /// Key format this generator writes.
    #[must_use]
    pub const fn format(&self) -> &KeyFormat {
        &self.format
    }

    /// Generate the registration key for `name`.
    ///
    /// # Errors
    ///
    /// See [`generate`].
    pub fn generate(&self, name: &str) -> LicenseResult<RegistrationKey> {
        generate_with(&self.key, name, &self.format)
    }
}

impl<K> std::fmt::Debug for KeyGenerator<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGenerator")
            .field("key", &"***")
            .field("format", &self.format)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, RawSignature};

    const VENDOR_DSA: &str = include_str!("../tests/fixtures/vendor_dsa.pem");

    /// Signing backend with a scripted result.
    struct ScriptedSigner(fn() -> LicenseResult<RawSignature>);

    impl SigningCapability for ScriptedSigner {
        fn sign(&self, _message: &[u8]) -> LicenseResult<RawSignature> {
            (self.0)()
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let generator = KeyGenerator::from_pem(VENDOR_DSA.as_bytes()).unwrap();
        assert!(matches!(
            generator.generate(""),
            Err(LicenseError::InvalidName(_))
        ));
    }

    #[test]
    fn empty_name_never_reaches_the_signer() {
        let signer = ScriptedSigner(|| panic!("signer must not be called"));
        assert!(matches!(
            generate(&signer, ""),
            Err(LicenseError::InvalidName(_))
        ));
    }

    #[test]
    fn empty_signature_is_generation_failure() {
        let signer = ScriptedSigner(|| Ok(RawSignature::new(Vec::new())));
        assert!(matches!(
            generate(&signer, "Joe Bloggs"),
            Err(LicenseError::KeyGenerationFailed)
        ));
    }

    #[test]
    fn backend_failure_propagates_unchanged() {
        let signer = ScriptedSigner(|| Err(LicenseError::SigningFailed(None)));
        assert!(matches!(
            generate(&signer, "Joe Bloggs"),
            Err(LicenseError::SigningFailed(None))
        ));
    }

    #[test]
    fn output_encodes_backend_signature() {
        let signer = ScriptedSigner(|| Ok(RawSignature::new(b"hello".to_vec())));
        let key = generate(&signer, "Joe Bloggs").unwrap();
        assert_eq!(key.as_str(), "NBSWY-3DP");
    }

    #[test]
    fn generator_honours_custom_format() {
        let signer = ScriptedSigner(|| Ok(RawSignature::new(b"hello".to_vec())));
        let format = KeyFormat::new(2, '.', true).unwrap();
        let generator = KeyGenerator::new(signer).with_format(format);
        assert_eq!(generator.generate("Joe").unwrap().as_str(), "NB.SW.Y3.DP");
    }

    #[test]
    fn generated_key_decodes_to_der_signature() {
        let generator = KeyGenerator::from_pem(VENDOR_DSA.as_bytes()).unwrap();
        let key = generator.generate("Joe Bloggs").unwrap();
        let raw = decode(key.as_str()).unwrap();
        assert_eq!(raw.as_bytes()[0], 0x30);
    }

    #[test]
    fn debug_hides_key() {
        let generator = KeyGenerator::from_pem(VENDOR_DSA.as_bytes()).unwrap();
        let debug = format!("{generator:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("inner"));
    }
}
