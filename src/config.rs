/*!
 * CSP configuration
 *
 * Plain `serde` structs. Where the values come from (file, environment,
 * flags) is up to the embedding application.
 */

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ResourceError;
use crate::secure_memory::SecureBytes;

/// Top-level CSP configuration consumed by the import pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    /// Whether private keys may be imported at all
    pub private_key_import: bool,

    pub session_pool: SessionPoolConfig,

    /// PKCS#11 module to store imported private keys in
    pub hsm: Option<HsmConfig>,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            private_key_import: false,
            session_pool: SessionPoolConfig::default(),
            hsm: None,
        }
    }
}

/// Limits of the HSM session pool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionPoolConfig {
    /// Most sessions open at once
    pub max_sessions: u32,

    /// How long an import waits for a free session, in milliseconds
    pub acquire_timeout_ms: u64,
}

impl Default for SessionPoolConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10,
            acquire_timeout_ms: 10_000,
        }
    }
}

impl SessionPoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.max_sessions == 0 {
            return Err(ResourceError::InvalidPoolConfig {
                parameter: "max_sessions".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ResourceError::InvalidPoolConfig {
                parameter: "acquire_timeout_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// PKCS#11 connection parameters
#[derive(Clone, Deserialize)]
pub struct HsmConfig {
    /// Path to the PKCS#11 library
    pub library_path: String,

    /// Slot ID to use
    #[serde(default)]
    pub slot_id: Option<u64>,

    /// Token label to use when no slot ID is given
    #[serde(default)]
    pub token_label: Option<String>,

    /// User PIN for authentication
    #[serde(default, deserialize_with = "deserialize_pin")]
    pub user_pin: Option<SecureBytes>,
}

impl fmt::Debug for HsmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HsmConfig")
            .field("library_path", &self.library_path)
            .field("slot_id", &self.slot_id)
            .field("token_label", &self.token_label)
            .field("user_pin", &"[REDACTED]")
            .finish()
    }
}

fn deserialize_pin<'de, D>(deserializer: D) -> Result<Option<SecureBytes>, D::Error>
where
    D: Deserializer<'de>,
{
    let pin = Option::<String>::deserialize(deserializer)?;
    Ok(pin.map(|p| SecureBytes::from(p.into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CspConfig::default();
        assert!(!config.private_key_import);
        assert_eq!(config.session_pool.max_sessions, 10);
        assert_eq!(config.session_pool.acquire_timeout(), Duration::from_secs(10));
        assert!(config.hsm.is_none());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: CspConfig = serde_json::from_str(
            r#"{
                "private_key_import": true,
                "session_pool": { "max_sessions": 4 },
                "hsm": {
                    "library_path": "/usr/lib/softhsm/libsofthsm2.so",
                    "token_label": "fabric",
                    "user_pin": "98765432"
                }
            }"#,
        )
        .unwrap();

        assert!(config.private_key_import);
        assert_eq!(config.session_pool.max_sessions, 4);
        assert_eq!(config.session_pool.acquire_timeout_ms, 10_000);

        let hsm = config.hsm.unwrap();
        assert_eq!(hsm.slot_id, None);
        assert_eq!(hsm.token_label.as_deref(), Some("fabric"));
        assert_eq!(hsm.user_pin.unwrap().as_bytes(), b"98765432");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        // Settings of other CSP layers share the same document
        let config: CspConfig = serde_json::from_str(
            r#"{ "security_level": 384, "hash_family": "SHA3", "private_key_import": true }"#,
        )
        .unwrap();
        assert!(config.private_key_import);
        assert_eq!(config.session_pool, SessionPoolConfig::default());
        assert!(config.hsm.is_none());
    }

    #[test]
    fn test_hsm_config_debug_hides_pin() {
        let config = HsmConfig {
            library_path: "/usr/lib/softhsm/libsofthsm2.so".to_string(),
            slot_id: Some(0),
            token_label: None,
            user_pin: Some(SecureBytes::from(b"98765432".to_vec())),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("98765432"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_pool_validation() {
        let mut pool = SessionPoolConfig::default();
        assert!(pool.validate().is_ok());

        pool.acquire_timeout_ms = 0;
        match pool.validate() {
            Err(ResourceError::InvalidPoolConfig { parameter, .. }) => {
                assert_eq!(parameter, "acquire_timeout_ms")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
