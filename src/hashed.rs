//! One-way keyed hashing with per-value or shared salts.
//!
//! Combined string format:
//! `"<hash function>:<iterations>:<base64 salt>:<base64 hash>"`
//!
//! PBKDF2-HMAC-SHA512 is used here purely as a one-way hash primitive. The
//! same construction backs two salting policies: a fresh random salt per
//! value ([`SaltedHash`], for values only ever checked against one known
//! candidate, e.g. passwords) and the registry's shared salt
//! ([`SearchableHash`], for values that must support exact-match lookup).

use base64ct::{Base64, Encoding};
use pbkdf2::pbkdf2_hmac;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::error::{Result, SecretsError};
use crate::keys::KeyRegistry;

/// Hash function identifier written into every combined string.
pub const PBKDF2_SHA512: &str = "PBKDF2-SHA512";

/// PBKDF2 iteration count for new hashes.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Random salt length in bytes.
pub const SALT_LENGTH: usize = 16;

/// Hash output length in bytes (SHA-512 width).
pub const HASH_LENGTH: usize = 64;

/// A salted one-way hash of one string value. Never stores the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedHash {
    hash_function: String,
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl SaltedHash {
    /// Hash `plain_text` with a fresh random 16-byte salt.
    pub fn new(plain_text: &str) -> Self {
        Self::with_salt(plain_text, &random_salt())
    }

    /// Hash `plain_text` with a caller-supplied salt.
    pub fn with_salt(plain_text: &str, salt: &[u8]) -> Self {
        let hash = derive(plain_text, salt, DEFAULT_ITERATIONS);
        Self {
            hash_function: PBKDF2_SHA512.to_string(),
            iterations: DEFAULT_ITERATIONS,
            salt: salt.to_vec(),
            hash,
        }
    }

    /// Check a candidate plaintext against the stored hash.
    ///
    /// Recomputes with the stored salt and iteration count, then compares in
    /// constant time. A mismatch is `false`, never an error.
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate_hash = derive(candidate, &self.salt, self.iterations);
        candidate_hash.ct_eq(&self.hash).into()
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Canonical colon-delimited serialization.
    pub fn to_combined_string(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.hash_function,
            self.iterations,
            Base64::encode_string(&self.salt),
            Base64::encode_string(&self.hash)
        )
    }

    /// Parse a combined string produced by [`to_combined_string`].
    ///
    /// `verify` cannot report errors, so unlike the encrypted field this
    /// rejects an unknown hash function at parse time.
    ///
    /// [`to_combined_string`]: Self::to_combined_string
    pub fn from_combined_string(combined: &str) -> Result<Self> {
        let parts: Vec<&str> = combined.split(':').collect();
        if parts.len() != 4 {
            return Err(SecretsError::Format(format!(
                "expected 4 colon-delimited parts, got {}",
                parts.len()
            )));
        }
        if parts[0] != PBKDF2_SHA512 {
            return Err(SecretsError::Format(format!(
                "unknown hash function: {}",
                parts[0]
            )));
        }
        let iterations: u32 = parts[1]
            .parse()
            .map_err(|_| SecretsError::Format(format!("invalid iteration count: {}", parts[1])))?;
        let salt = Base64::decode_vec(parts[2])
            .map_err(|e| SecretsError::Format(format!("invalid salt base64: {e}")))?;
        let hash = Base64::decode_vec(parts[3])
            .map_err(|e| SecretsError::Format(format!("invalid hash base64: {e}")))?;
        Ok(Self {
            hash_function: parts[0].to_string(),
            iterations,
            salt,
            hash,
        })
    }
}

impl Serialize for SaltedHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_combined_string())
    }
}

impl<'de> Deserialize<'de> for SaltedHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let combined = String::deserialize(deserializer)?;
        Self::from_combined_string(&combined).map_err(D::Error::custom)
    }
}

/// A [`SaltedHash`] built with the registry's shared salt, so equal
/// plaintexts produce byte-identical hashes and the stored string supports
/// exact-match lookup in the document store.
///
/// The shared salt trades precomputation resistance for searchability.
/// Acceptable only for fields that must be searched (usernames, email
/// addresses); values checked against a single known candidate keep
/// per-value random salts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableHash(SaltedHash);

impl SearchableHash {
    /// Hash `plain_text` with the registry's shared salt.
    pub fn new(registry: &KeyRegistry, plain_text: &str) -> Result<Self> {
        let salt = registry.hash_salt()?;
        Ok(Self(SaltedHash::with_salt(plain_text, salt.bytes())))
    }

    pub fn verify(&self, candidate: &str) -> bool {
        self.0.verify(candidate)
    }

    pub fn to_combined_string(&self) -> String {
        self.0.to_combined_string()
    }

    pub fn from_combined_string(combined: &str) -> Result<Self> {
        SaltedHash::from_combined_string(combined).map(Self)
    }

    pub fn as_salted_hash(&self) -> &SaltedHash {
        &self.0
    }
}

impl Serialize for SearchableHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SearchableHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        SaltedHash::deserialize(deserializer).map(Self)
    }
}

fn derive(plain_text: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha512>(plain_text.as_bytes(), salt, iterations, &mut out);
    out.to_vec()
}

/// Generate a random 16-byte salt.
fn random_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    getrandom::getrandom(&mut salt).expect("getrandom failed");
    salt
}
