//! Reversible field encryption tagged with the key that produced it.
//!
//! Combined string format:
//! `"<cipher>:<base64 iv>:<key name>:<base64 ciphertext>"`
//!
//! The key name recorded at encryption time, not the registry's current
//! primary, decides which key decrypts a stored value. Operators promote a
//! new primary and demote the old one to a rollover slot; existing values
//! keep decrypting until they are rewritten or the old key is finally
//! dropped, at which point they are permanently undecryptable.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64ct::{Base64, Encoding};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SecretsError};
use crate::keys::KeyRegistry;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cipher identifier written into every combined string.
pub const AES_256_CBC: &str = "AES-256-CBC";

/// AES-256 key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-CBC IV length in bytes.
pub const AES_IV_LENGTH: usize = 16;

/// One encrypted string value, immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    cipher: String,
    iv: Vec<u8>,
    key_name: String,
    cipher_text: Vec<u8>,
}

impl EncryptedField {
    /// Encrypt `plain_text` under the registry's current primary key with a
    /// fresh random IV.
    pub fn encrypt(registry: &KeyRegistry, plain_text: &str) -> Result<Self> {
        let key = registry.primary()?;
        let iv = generate_iv();
        let encryptor = Aes256CbcEnc::new_from_slices(key.bytes(), &iv).map_err(|_| {
            SecretsError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                got: key.bytes().len(),
            }
        })?;
        let cipher_text = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain_text.as_bytes());
        Ok(Self {
            cipher: AES_256_CBC.to_string(),
            iv: iv.to_vec(),
            key_name: key.name().to_string(),
            cipher_text,
        })
    }

    /// Decrypt using whichever registry key this value was encrypted under.
    ///
    /// Fails with `KeyNotFound` once that key has been retired from the
    /// registry, and with `Decryption` on an IV/key/padding mismatch.
    pub fn decrypt(&self, registry: &KeyRegistry) -> Result<String> {
        if self.cipher != AES_256_CBC {
            return Err(SecretsError::UnknownCipher(self.cipher.clone()));
        }
        let key = registry.key(&self.key_name)?;
        if self.iv.len() != AES_IV_LENGTH {
            return Err(SecretsError::Decryption(format!(
                "IV must be {} bytes, got {}",
                AES_IV_LENGTH,
                self.iv.len()
            )));
        }
        let decryptor = Aes256CbcDec::new_from_slices(key.bytes(), &self.iv).map_err(|_| {
            SecretsError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                got: key.bytes().len(),
            }
        })?;
        let plain = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&self.cipher_text)
            .map_err(|_| SecretsError::Decryption("bad padding or corrupted ciphertext".into()))?;
        String::from_utf8(plain)
            .map_err(|_| SecretsError::Decryption("plaintext is not valid UTF-8".into()))
    }

    /// Whether this value was encrypted under the registry's current primary.
    ///
    /// Returns `false` after the encrypting key has been demoted to a
    /// rollover slot; callers typically re-encrypt the value then.
    pub fn encrypted_with_primary(&self, registry: &KeyRegistry) -> Result<bool> {
        registry.is_primary(&self.key_name)
    }

    /// Name of the key this value was encrypted under.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn cipher(&self) -> &str {
        &self.cipher
    }

    /// Canonical colon-delimited serialization handed to the persistence
    /// layer, which treats it as opaque.
    pub fn to_combined_string(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.cipher,
            Base64::encode_string(&self.iv),
            self.key_name,
            Base64::encode_string(&self.cipher_text)
        )
    }

    /// Parse a combined string produced by [`to_combined_string`].
    ///
    /// The cipher name is not validated here; an unsupported cipher only
    /// surfaces on [`decrypt`], matching the write path that produced it.
    ///
    /// [`to_combined_string`]: Self::to_combined_string
    /// [`decrypt`]: Self::decrypt
    pub fn from_combined_string(combined: &str) -> Result<Self> {
        let parts: Vec<&str> = combined.split(':').collect();
        if parts.len() != 4 {
            return Err(SecretsError::Format(format!(
                "expected 4 colon-delimited parts, got {}",
                parts.len()
            )));
        }
        let iv = Base64::decode_vec(parts[1])
            .map_err(|e| SecretsError::Format(format!("invalid IV base64: {e}")))?;
        let cipher_text = Base64::decode_vec(parts[3])
            .map_err(|e| SecretsError::Format(format!("invalid ciphertext base64: {e}")))?;
        Ok(Self {
            cipher: parts[0].to_string(),
            iv,
            key_name: parts[2].to_string(),
            cipher_text,
        })
    }
}

impl Serialize for EncryptedField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_combined_string())
    }
}

impl<'de> Deserialize<'de> for EncryptedField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let combined = String::deserialize(deserializer)?;
        Self::from_combined_string(&combined).map_err(D::Error::custom)
    }
}

/// Generate a random 16-byte IV for AES-CBC.
fn generate_iv() -> [u8; AES_IV_LENGTH] {
    let mut iv = [0u8; AES_IV_LENGTH];
    getrandom::getrandom(&mut iv).expect("getrandom failed");
    iv
}
