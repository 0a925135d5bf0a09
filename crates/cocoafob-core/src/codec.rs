//! Registration key text format.
//!
//! A raw DSA signature is turned into a human-typeable key in three steps:
//!
//! 1. Unpadded RFC 4648 Base32 (`A-Z`, `2-7`).
//! 2. The two letters most often misread, `O` and `I`, become `8` and `9`.
//!    Neither digit belongs to the Base32 alphabet, so the substitution is
//!    unambiguous and the result is still a 32-symbol alphabet.
//! 3. The text is split into groups of [`DEFAULT_GROUP_SIZE`] characters
//!    joined by [`DEFAULT_SEPARATOR`]. The last group may be shorter.
//!
//! Decoding reverses this and tolerates what people do when typing a key:
//! surrounding or embedded whitespace, lowercase letters, and typing `O`/`I`
//! instead of `8`/`9`.
//!
//! Both directions are pure. `decode(encode(s)) == s` for every non-empty `s`.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, LicenseResult};

// ── Constants ───────────────────────────────────────────────────────

/// Characters per group in the canonical format.
pub const DEFAULT_GROUP_SIZE: usize = 5;

/// Group separator in the canonical format.
pub const DEFAULT_SEPARATOR: char = '-';

/// Base32 letter `O` is written as this digit.
const O_SUBSTITUTE: char = '8';

/// Base32 letter `I` is written as this digit.
const I_SUBSTITUTE: char = '9';

// ── Types ───────────────────────────────────────────────────────────

/// Raw signature bytes, opaque to the codec.
///
/// For DSA this is the DER encoding of the `(r, s)` pair.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RawSignature(Vec<u8>);

impl RawSignature {
    /// Wrap raw signature bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of signature bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the backend produced no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the wrapper and return the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSignature({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for RawSignature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RawSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// User-facing registration key text, e.g. `GAWQE-F9AUQ-NE4TD-...`.
#[must_use = "registration key should be delivered to the customer"]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationKey(String);

impl RegistrationKey {
    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the key text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RegistrationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RegistrationKey {
    type Err = LicenseError;

    /// Parse user-typed text into its canonical form.
    ///
    /// The text is decoded and re-encoded, so `" gawqe-f9auq "` becomes
    /// `"GAWQE-F9AUQ"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = decode(s)?;
        Ok(encode(raw.as_bytes()))
    }
}

/// Text layout of registration keys.
///
/// [`KeyFormat::default`] is the canonical format. Hosts that need a
/// different layout can load one with [`KeyFormat::from_json`]; generator and
/// verifier must agree on the separator but decoding ignores grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyFormatConfig", into = "KeyFormatConfig")]
pub struct KeyFormat {
    group_size: usize,
    separator: char,
    substitute_ambiguous: bool,
}

/// Serialized form of [`KeyFormat`]; missing fields take canonical values.
#[derive(Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KeyFormatConfig {
    group_size: usize,
    separator: char,
    substitute_ambiguous: bool,
}

impl Default for KeyFormatConfig {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            separator: DEFAULT_SEPARATOR,
            substitute_ambiguous: true,
        }
    }
}

impl TryFrom<KeyFormatConfig> for KeyFormat {
    type Error = LicenseError;

    fn try_from(config: KeyFormatConfig) -> Result<Self, Self::Error> {
        Self::new(
            config.group_size,
            config.separator,
            config.substitute_ambiguous,
        )
    }
}

impl From<KeyFormat> for KeyFormatConfig {
    fn from(format: KeyFormat) -> Self {
        Self {
            group_size: format.group_size,
            separator: format.separator,
            substitute_ambiguous: format.substitute_ambiguous,
        }
    }
}

impl Default for KeyFormat {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            separator: DEFAULT_SEPARATOR,
            substitute_ambiguous: true,
        }
    }
}

impl KeyFormat {
    /// Create a validated key format.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] if `group_size` is zero, or if
    /// `separator` is alphanumeric, whitespace or a control character (any of
    /// which would make keys ambiguous to decode).
    pub fn new(
        group_size: usize,
        separator: char,
        substitute_ambiguous: bool,
    ) -> LicenseResult<Self> {
        let format = Self {
            group_size,
            separator,
            substitute_ambiguous,
        };
        format.validate()?;
        Ok(format)
    }

    /// Check that this format can be written and read back unambiguously.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] if the group size is zero or
    /// the separator could be mistaken for a key character.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.group_size == 0 {
            return Err(LicenseError::InvalidFormat(
                "group size must be at least 1".to_owned(),
            ));
        }
        let separator = self.separator;
        if separator.is_alphanumeric() || separator.is_whitespace() || separator.is_control() {
            return Err(LicenseError::InvalidFormat(format!(
                "separator {separator:?} collides with key characters"
            )));
        }
        Ok(())
    }

    /// Load a key format from a JSON object such as
    /// `{"group_size": 4, "separator": "-"}`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] if the JSON is malformed,
    /// carries unknown fields, or describes an unusable format.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        serde_json::from_str(json).map_err(|e| LicenseError::InvalidFormat(e.to_string()))
    }

    /// Characters per group.
    #[must_use]
    pub const fn group_size(&self) -> usize {
        self.group_size
    }

    /// Group separator.
    #[must_use]
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Whether `O`/`I` are written as `8`/`9`.
    #[must_use]
    pub const fn substitute_ambiguous(&self) -> bool {
        self.substitute_ambiguous
    }
}

// ── Encode ──────────────────────────────────────────────────────────

/// Encode signature bytes in the canonical registration key format.
///
/// Output is stable: the same bytes always produce the same text. An empty
/// input produces an empty key, which [`decode`] rejects.
pub fn encode(signature: &[u8]) -> RegistrationKey {
    encode_with(signature, &KeyFormat::default())
}

/// Encode signature bytes using a custom [`KeyFormat`].
pub fn encode_with(signature: &[u8], format: &KeyFormat) -> RegistrationKey {
    let symbols: Vec<char> = BASE32_NOPAD
        .encode(signature)
        .chars()
        .map(|c| match c {
            'O' if format.substitute_ambiguous => O_SUBSTITUTE,
            'I' if format.substitute_ambiguous => I_SUBSTITUTE,
            other => other,
        })
        .collect();

    let groups: Vec<String> = symbols
        .chunks(format.group_size)
        .map(|group| group.iter().collect())
        .collect();

    RegistrationKey(groups.join(&format.separator.to_string()))
}

// ── Decode ──────────────────────────────────────────────────────────

/// Decode registration key text in the canonical format.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedKey`] if the cleaned text is empty,
/// contains characters outside the alphabet, has a length no unpadded Base32
/// string can have, or carries non-zero trailing bits.
pub fn decode(text: &str) -> LicenseResult<RawSignature> {
    decode_with(text, &KeyFormat::default())
}

/// Decode registration key text written with a custom [`KeyFormat`].
///
/// Grouping is ignored; only the separator is stripped. `8`/`9` are always
/// read back as `O`/`I`, whether or not the format substitutes them.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_with(text: &str, format: &KeyFormat) -> LicenseResult<RawSignature> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != format.separator && !c.is_whitespace())
        .map(|c| match c.to_ascii_uppercase() {
            O_SUBSTITUTE => 'O',
            I_SUBSTITUTE => 'I',
            other => other,
        })
        .collect();

    if cleaned.is_empty() {
        return Err(LicenseError::MalformedKey(
            "registration key is empty".to_owned(),
        ));
    }

    let bytes = BASE32_NOPAD
        .decode(cleaned.as_bytes())
        .map_err(|e| LicenseError::MalformedKey(e.to_string()))?;

    Ok(RawSignature(bytes))
}

// ── Unit tests ──────────────────────────────────────────────────────
