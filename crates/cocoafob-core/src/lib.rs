//! `cocoafob-core` — name-bound software registration keys.
//!
//! A vendor signs the customer's name with a DSA private key. The signature
//! becomes a human-typeable key such as `GAWQE-F9AUQ-NE4TD-...`. The shipped
//! application holds only the public key and can check a (name, key) pair
//! but cannot forge one.
//!
//! ```text
//! name ─utf8─▶ SHA-1 ─DSA─▶ DER (r, s) ─Base32─▶ GAWQE-F9AUQ-...
//! ```
//!
//! Zero network, zero async, zero filesystem. Loading PEM bytes from disk
//! and any CLI live with the caller.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod codec;
pub mod key_material;

pub mod generator;
pub mod verifier;

pub use codec::{
    decode, decode_with, encode, encode_with, KeyFormat, RawSignature, RegistrationKey,
    DEFAULT_GROUP_SIZE, DEFAULT_SEPARATOR,
};
pub use error::{LicenseError, LicenseResult};
pub use generator::{generate, generate_with, KeyGenerator};
pub use key_material::{
    PrivateSigningKey, PublicVerifyingKey, SigningCapability, VerifyingCapability,
};
pub use verifier::{verify, verify_with, KeyVerifier};
