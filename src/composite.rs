//! A single attribute stored both reversibly encrypted and searchably hashed.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::encrypted::EncryptedField;
use crate::error::Result;
use crate::hashed::SearchableHash;
use crate::keys::KeyRegistry;

/// One logical value (say, an email address) that the server must be able
/// to recover and the document store must be able to find by exact match,
/// without plaintext ever reaching storage.
///
/// Both halves are derived independently from the same plaintext at
/// construction and persisted as two separate combined strings: the store
/// indexes the hash half and treats the encrypted half as opaque. Nothing
/// re-validates the pair on load; see [`verify`](Self::verify).
#[derive(Serialize, Deserialize)]
pub struct SearchableSecret {
    encrypted: EncryptedField,
    hash: SearchableHash,
    #[serde(skip)]
    plain: OnceCell<String>,
}

impl SearchableSecret {
    /// Encrypt and hash `plain_text` under the registry's current primary
    /// key and shared salt.
    pub fn new(registry: &KeyRegistry, plain_text: &str) -> Result<Self> {
        let encrypted = EncryptedField::encrypt(registry, plain_text)?;
        let hash = SearchableHash::new(registry, plain_text)?;
        Ok(Self {
            encrypted,
            hash,
            plain: OnceCell::from(plain_text.to_string()),
        })
    }

    /// Reassemble from the two stored combined-string halves.
    pub fn from_parts(encrypted: EncryptedField, hash: SearchableHash) -> Self {
        Self {
            encrypted,
            hash,
            plain: OnceCell::new(),
        }
    }

    /// The original value, decrypted on first access and cached after.
    ///
    /// A race between first accessors decrypts redundantly; only one result
    /// is kept and both observe the same cached string.
    pub fn plain_text(&self, registry: &KeyRegistry) -> Result<&str> {
        self.plain
            .get_or_try_init(|| self.encrypted.decrypt(registry))
            .map(String::as_str)
    }

    /// The reversible half, persisted as an opaque combined string.
    pub fn encrypted(&self) -> &EncryptedField {
        &self.encrypted
    }

    /// The searchable half; its combined string is what exact-match queries
    /// compare against.
    pub fn hash(&self) -> &SearchableHash {
        &self.hash
    }

    /// Check that the two halves still describe the same value.
    ///
    /// The halves are stored as independent strings and nothing binds them
    /// cryptographically, so one edited or corrupted out of band makes
    /// decryption and hash lookup silently disagree. Callers that load
    /// records from untrusted storage can use this to detect the split.
    pub fn verify(&self, registry: &KeyRegistry) -> Result<bool> {
        let plain = self.plain_text(registry)?;
        Ok(self.hash.verify(plain))
    }
}

// The cached plaintext must never leak through Debug output.
impl fmt::Debug for SearchableSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchableSecret")
            .field("encrypted", &self.encrypted)
            .field("hash", &self.hash)
            .field("plain", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyConfig;
    use crate::error::SecretsError;

    fn registry() -> KeyRegistry {
        KeyRegistry::new(KeyConfig::new(
            "TEST_KEY:8C532F0C2CCE7AF471111285340B6353FCB327DF9AB9F0121731F403E3FFDC7C",
            vec![],
            "SHARED_SALT:77FD12962DF41805B3AA1D6CA38FD829",
        ))
    }

    #[test]
    fn both_halves_derive_from_the_same_plaintext() {
        let registry = registry();
        let secret = SearchableSecret::new(&registry, "user@example.com").unwrap();
        assert_eq!(secret.encrypted().decrypt(&registry).unwrap(), "user@example.com");
        assert!(secret.hash().verify("user@example.com"));
    }

    #[test]
    fn plain_text_is_cached_after_first_access() {
        let registry = registry();
        let secret = SearchableSecret::new(&registry, "user@example.com").unwrap();
        let stored = SearchableSecret::from_parts(
            EncryptedField::from_combined_string(&secret.encrypted().to_combined_string())
                .unwrap(),
            SearchableHash::from_combined_string(&secret.hash().to_combined_string()).unwrap(),
        );

        assert_eq!(stored.plain_text(&registry).unwrap(), "user@example.com");

        // Retire the key; the cached value must keep answering.
        let rotated = KeyRegistry::new(KeyConfig::new(
            "NEW_KEY:12FE1D86B4849B34FC1C950E671284BC30DA751E3331C0F36F15F7F51C7922D8",
            vec![],
            "SHARED_SALT:77FD12962DF41805B3AA1D6CA38FD829",
        ));
        assert_eq!(stored.plain_text(&rotated).unwrap(), "user@example.com");
    }

    #[test]
    fn uncached_plain_text_needs_a_registered_key() {
        let registry = registry();
        let secret = SearchableSecret::new(&registry, "user@example.com").unwrap();
        let stored = SearchableSecret::from_parts(secret.encrypted().clone(), secret.hash().clone());

        let rotated = KeyRegistry::new(KeyConfig::new(
            "NEW_KEY:12FE1D86B4849B34FC1C950E671284BC30DA751E3331C0F36F15F7F51C7922D8",
            vec![],
            "SHARED_SALT:77FD12962DF41805B3AA1D6CA38FD829",
        ));
        let err = stored.plain_text(&rotated).unwrap_err();
        assert!(matches!(err, SecretsError::KeyNotFound(_)));
    }

    #[test]
    fn searchable_halves_match_across_instances() {
        let registry = registry();
        let a = SearchableSecret::new(&registry, "user@example.com").unwrap();
        let b = SearchableSecret::new(&registry, "user@example.com").unwrap();
        // The encrypted halves differ (fresh IVs); the hash halves are the
        // lookup key and must be identical.
        assert_ne!(
            a.encrypted().to_combined_string(),
            b.encrypted().to_combined_string()
        );
        assert_eq!(a.hash().to_combined_string(), b.hash().to_combined_string());
    }

    #[test]
    fn verify_detects_out_of_band_hash_swap() {
        let registry = registry();
        let secret = SearchableSecret::new(&registry, "user@example.com").unwrap();
        assert!(secret.verify(&registry).unwrap());

        let swapped = SearchableSecret::from_parts(
            secret.encrypted().clone(),
            SearchableHash::new(&registry, "other@example.com").unwrap(),
        );
        assert!(!swapped.verify(&registry).unwrap());
    }

    #[test]
    fn serde_round_trips_both_halves() {
        let registry = registry();
        let secret = SearchableSecret::new(&registry, "user@example.com").unwrap();
        let json = serde_json::to_string(&secret).unwrap();
        assert!(!json.contains("user@example.com"));

        let parsed: SearchableSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.plain_text(&registry).unwrap(), "user@example.com");
        assert_eq!(
            parsed.hash().to_combined_string(),
            secret.hash().to_combined_string()
        );
    }
}
