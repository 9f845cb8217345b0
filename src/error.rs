use thiserror::Error;

/// Errors surfaced by key loading, field encryption, and hashing.
///
/// All variants are non-retryable: they indicate an operational or
/// configuration fault, never a transient condition. Hash verification
/// (`SaltedHash::verify`) reports a mismatch as `false`, not as an error.
#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("Missing secret configuration: {0}")]
    Configuration(String),

    #[error("Malformed key value ({0}): expected \"<name>:<hex>\"")]
    KeyFormat(String),

    #[error("Invalid hex in key material: {0}")]
    Hex(String),

    #[error("No key named \"{0}\" is registered")]
    KeyNotFound(String),

    #[error("Duplicate key name: {0}")]
    DuplicateKey(String),

    #[error("Malformed combined string: {0}")]
    Format(String),

    #[error("Unsupported cipher: {0}")]
    UnknownCipher(String),

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

pub type Result<T> = std::result::Result<T, SecretsError>;
