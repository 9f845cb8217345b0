//! Field-level secret encryption, searchable keyed hashing, and key rotation
//! for stored records.
//!
//! Components:
//! - [`KeyRegistry`]: named AES-256 keys (one primary, N rollover) plus one
//!   shared hash salt, lazily loaded from injected configuration
//! - [`EncryptedField`]: reversible AES-256-CBC encryption of one value,
//!   tagged with the name of the key that produced it
//! - [`SaltedHash`]: one-way PBKDF2-SHA512 hash with a random per-value salt
//! - [`SearchableHash`]: the same hash under the registry's shared salt, for
//!   exact-match lookup
//! - [`SearchableSecret`]: one value kept both recoverable and searchable
//!
//! Each field wrapper serializes to a canonical colon-delimited combined
//! string that the persistence layer stores and returns verbatim; the
//! composite type persists as one combined string per half.

pub mod composite;
pub mod config;
pub mod encrypted;
pub mod error;
pub mod hashed;
pub mod keys;

pub use composite::SearchableSecret;
pub use config::{EnvNames, KeyConfig, ENV_HASH_SALT, ENV_KEY_PRIMARY, ENV_KEY_ROLLOVER_PREFIX};
pub use encrypted::{EncryptedField, AES_256_CBC, AES_IV_LENGTH, AES_KEY_LENGTH};
pub use error::{Result, SecretsError};
pub use hashed::{
    SaltedHash, SearchableHash, DEFAULT_ITERATIONS, HASH_LENGTH, PBKDF2_SHA512, SALT_LENGTH,
};
pub use keys::{KeyRegistry, NamedKey};
