//! Error types for `cocoafob-core`.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Errors produced while generating, encoding or checking registration keys.
///
/// Generation-side variants reach the caller unchanged. The verifier narrows
/// every variant to `false` (see [`crate::verifier`]).
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The name is empty or cannot be encoded.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// PEM or DER key material is unparsable, carries the wrong label, or is
    /// not a DSA key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The signing backend failed. `None` when the backend reported no
    /// diagnostic.
    #[error("signing failed{}", detail(.0.as_deref()))]
    SigningFailed(Option<String>),

    /// The signing backend returned an empty signature.
    #[error("key generation failed: signing produced no output")]
    KeyGenerationFailed,

    /// Registration key text does not decode to a byte sequence.
    #[error("malformed registration key: {0}")]
    MalformedKey(String),

    /// Signature bytes are not a structurally valid DER `(r, s)` pair.
    #[error("verification error: {0}")]
    VerificationError(String),

    /// A [`crate::codec::KeyFormat`] setting cannot produce decodable keys.
    #[error("invalid key format: {0}")]
    InvalidFormat(String),
}

fn detail(reason: Option<&str>) -> String {
    reason.map_or_else(String::new, |r| format!(": {r}"))
}
