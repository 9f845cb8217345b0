//! Key configuration injected into [`KeyRegistry`](crate::keys::KeyRegistry).
//!
//! The host builds one [`KeyConfig`] at startup, from the environment or
//! whatever configuration source it prefers, and hands it to the registry.
//! Each value is a `"<name>:<hex>"` string; parsing and validation happen
//! lazily on first registry access, not here.

use std::cmp::Ordering;
use std::env;

use serde::Deserialize;

/// Default environment variable holding the primary encryption key.
pub const ENV_KEY_PRIMARY: &str = "SEALBOX_KEY_PRIMARY";

/// Default environment variable prefix for rollover encryption keys.
pub const ENV_KEY_ROLLOVER_PREFIX: &str = "SEALBOX_KEY_ROLLOVER_";

/// Default environment variable holding the shared hash salt.
pub const ENV_HASH_SALT: &str = "SEALBOX_HASH_SALT";

/// Raw key material configuration, prior to parsing.
///
/// `primary` and `hash_salt` are single `"<name>:<hex>"` values; `rollovers`
/// is an ordered list of the same shape. Generate encryption keys with
/// `openssl rand -hex 32` and hash salts with `openssl rand -hex 16`.
#[derive(Clone, Default, Deserialize)]
pub struct KeyConfig {
    pub primary: String,
    #[serde(default)]
    pub rollovers: Vec<String>,
    pub hash_salt: String,
}

impl KeyConfig {
    pub fn new(
        primary: impl Into<String>,
        rollovers: Vec<String>,
        hash_salt: impl Into<String>,
    ) -> Self {
        Self {
            primary: primary.into(),
            rollovers,
            hash_salt: hash_salt.into(),
        }
    }

    /// Read configuration from the default `SEALBOX_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_env_with(&EnvNames::default())
    }

    /// Read configuration from custom environment variable names.
    ///
    /// Every variable starting with `names.rollover_prefix` contributes one
    /// rollover key. Variables with a numeric suffix sort numerically
    /// (`..._2` before `..._10`), the rest lexicographically after them.
    /// Unset or blank variables are skipped; missing primary/salt values
    /// surface as `Configuration` errors on first registry access.
    pub fn from_env_with(names: &EnvNames) -> Self {
        let mut rollovers: Vec<(String, String)> = env::vars()
            .filter(|(name, value)| {
                name.starts_with(&names.rollover_prefix) && !value.trim().is_empty()
            })
            .collect();
        rollovers.sort_by(|(a, _), (b, _)| {
            suffix_order(&a[names.rollover_prefix.len()..], &b[names.rollover_prefix.len()..])
        });

        Self {
            primary: env::var(&names.primary).unwrap_or_default(),
            rollovers: rollovers.into_iter().map(|(_, value)| value).collect(),
            hash_salt: env::var(&names.hash_salt).unwrap_or_default(),
        }
    }
}

// Key values are secrets; keep them out of Debug output.
impl std::fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyConfig")
            .field("primary", &"[REDACTED]")
            .field("rollovers", &format_args!("[REDACTED; {}]", self.rollovers.len()))
            .field("hash_salt", &"[REDACTED]")
            .finish()
    }
}

/// Environment variable names used by [`KeyConfig::from_env_with`].
#[derive(Debug, Clone)]
pub struct EnvNames {
    pub primary: String,
    pub rollover_prefix: String,
    pub hash_salt: String,
}

impl Default for EnvNames {
    fn default() -> Self {
        Self {
            primary: ENV_KEY_PRIMARY.to_string(),
            rollover_prefix: ENV_KEY_ROLLOVER_PREFIX.to_string(),
            hash_salt: ENV_HASH_SALT.to_string(),
        }
    }
}

fn suffix_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str) -> EnvNames {
        EnvNames {
            primary: format!("{prefix}_KEY_PRIMARY"),
            rollover_prefix: format!("{prefix}_KEY_ROLLOVER_"),
            hash_salt: format!("{prefix}_HASH_SALT"),
        }
    }

    #[test]
    fn reads_primary_and_salt() {
        let names = names("SB_CFG_A");
        env::set_var(&names.primary, "MAIN:00ff");
        env::set_var(&names.hash_salt, "SALT:a1b2");

        let config = KeyConfig::from_env_with(&names);
        assert_eq!(config.primary, "MAIN:00ff");
        assert_eq!(config.hash_salt, "SALT:a1b2");
        assert!(config.rollovers.is_empty());
    }

    #[test]
    fn missing_vars_yield_empty_values() {
        let config = KeyConfig::from_env_with(&names("SB_CFG_UNSET"));
        assert_eq!(config.primary, "");
        assert_eq!(config.hash_salt, "");
        assert!(config.rollovers.is_empty());
    }

    #[test]
    fn rollovers_sort_numerically() {
        let names = names("SB_CFG_B");
        env::set_var(format!("{}10", names.rollover_prefix), "K10:0a");
        env::set_var(format!("{}2", names.rollover_prefix), "K2:0b");
        env::set_var(format!("{}1", names.rollover_prefix), "K1:0c");

        let config = KeyConfig::from_env_with(&names);
        assert_eq!(config.rollovers, vec!["K1:0c", "K2:0b", "K10:0a"]);
    }

    #[test]
    fn blank_rollovers_are_skipped() {
        let names = names("SB_CFG_C");
        env::set_var(format!("{}1", names.rollover_prefix), "  ");
        env::set_var(format!("{}2", names.rollover_prefix), "K2:0b");

        let config = KeyConfig::from_env_with(&names);
        assert_eq!(config.rollovers, vec!["K2:0b"]);
    }

    #[test]
    fn deserializes_from_config_source() {
        let config: KeyConfig = serde_json::from_str(
            r#"{"primary": "MAIN:00ff", "rollovers": ["OLD:0a"], "hash_salt": "SALT:a1"}"#,
        )
        .unwrap();
        assert_eq!(config.primary, "MAIN:00ff");
        assert_eq!(config.rollovers, vec!["OLD:0a"]);
    }

    #[test]
    fn debug_redacts_key_material() {
        let config = KeyConfig::new("MAIN:deadbeef", vec!["OLD:0a".into()], "SALT:a1");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("deadbeef"));
        assert!(rendered.contains("REDACTED"));
    }
}
