//! Named key material and the key registry.
//!
//! The registry distinguishes one *primary* key (used for every new
//! encryption) from *rollover* keys (retained only to decrypt values written
//! under a former primary), plus one shared hash salt. Keys load lazily from
//! the injected [`KeyConfig`] on first access; after that, reads are
//! lock-free from any number of threads. Reloading configuration means
//! constructing a fresh registry.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::KeyConfig;
use crate::error::{Result, SecretsError};

/// A named symmetric key or hash salt.
///
/// The name ties stored ciphertext back to the key that produced it; the
/// bytes are scrubbed when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NamedKey {
    #[zeroize(skip)]
    name: String,
    bytes: Vec<u8>,
}

impl NamedKey {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedKey")
            .field("name", &self.name)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl FromStr for NamedKey {
    type Err = SecretsError;

    /// Parse a `"<name>:<hex>"` configuration value.
    fn from_str(value: &str) -> Result<Self> {
        let (name, payload) = value
            .split_once(':')
            .ok_or_else(|| SecretsError::KeyFormat("missing \":\" separator".into()))?;
        if name.trim().is_empty() {
            return Err(SecretsError::KeyFormat("empty key name".into()));
        }
        if payload.trim().is_empty() {
            return Err(SecretsError::Hex("empty hex payload".into()));
        }
        let bytes = hex::decode(payload).map_err(|e| SecretsError::Hex(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            bytes,
        })
    }
}

/// The loaded key set: one primary plus any number of rollovers.
#[derive(Debug)]
struct KeyRing {
    primary: NamedKey,
    rollovers: Vec<NamedKey>,
}

impl KeyRing {
    fn from_config(config: &KeyConfig) -> Result<Self> {
        if config.primary.trim().is_empty() {
            return Err(SecretsError::Configuration(
                "primary encryption key is not set".into(),
            ));
        }
        let primary: NamedKey = config.primary.parse()?;

        let mut rollovers: Vec<NamedKey> = Vec::with_capacity(config.rollovers.len());
        for value in &config.rollovers {
            if value.trim().is_empty() {
                continue;
            }
            let key: NamedKey = value.parse()?;
            if key.name == primary.name || rollovers.iter().any(|k| k.name == key.name) {
                return Err(SecretsError::DuplicateKey(key.name.clone()));
            }
            rollovers.push(key);
        }

        Ok(Self { primary, rollovers })
    }
}

/// Lazily loaded store of encryption keys and the shared hash salt.
///
/// Construct one per process and pass it by reference to every consumer.
/// The first accessor parses the configuration under the `OnceCell` lock;
/// concurrent first-accessors never observe a half-initialized ring.
pub struct KeyRegistry {
    config: KeyConfig,
    keys: OnceCell<KeyRing>,
    salt: OnceCell<NamedKey>,
}

impl KeyRegistry {
    pub fn new(config: KeyConfig) -> Self {
        Self {
            config,
            keys: OnceCell::new(),
            salt: OnceCell::new(),
        }
    }

    /// The key used for all new encryption operations.
    pub fn primary(&self) -> Result<&NamedKey> {
        Ok(&self.ring()?.primary)
    }

    /// Look up a key by exact name, searching the primary then rollovers.
    ///
    /// Values encrypted under a demoted primary keep decrypting through this
    /// lookup until the key is dropped from the rollover list entirely.
    pub fn key(&self, name: &str) -> Result<&NamedKey> {
        let ring = self.ring()?;
        if ring.primary.name == name {
            return Ok(&ring.primary);
        }
        ring.rollovers
            .iter()
            .find(|key| key.name == name)
            .ok_or_else(|| SecretsError::KeyNotFound(name.to_string()))
    }

    /// Whether `name` refers to the current primary key.
    pub fn is_primary(&self, name: &str) -> Result<bool> {
        Ok(self.ring()?.primary.name == name)
    }

    /// The shared salt used by searchable hashes.
    pub fn hash_salt(&self) -> Result<&NamedKey> {
        self.salt.get_or_try_init(|| {
            if self.config.hash_salt.trim().is_empty() {
                return Err(SecretsError::Configuration("hash salt is not set".into()));
            }
            let salt: NamedKey = self.config.hash_salt.parse()?;
            tracing::debug!(salt = %salt.name, "loaded hash salt");
            Ok(salt)
        })
    }

    fn ring(&self) -> Result<&KeyRing> {
        self.keys.get_or_try_init(|| {
            let ring = KeyRing::from_config(&self.config)?;
            tracing::debug!(
                primary = %ring.primary.name,
                rollovers = ring.rollovers.len(),
                "loaded encryption keys"
            );
            Ok(ring)
        })
    }
}

impl fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("loaded", &self.keys.get().is_some())
            .field("salt_loaded", &self.salt.get().is_some())
            .finish()
    }
}
