/*!
 * Import policy gate
 *
 * Private-key import is off unless the configuration turns it on. The gate
 * is evaluated before the raw material is looked at, so a disabled policy
 * rejects well-formed and malformed input alike and never reaches the HSM.
 */

use crate::config::CspConfig;
use crate::error::{ImportError, ImportResult};
use crate::import::ImportVariant;

/// Policies the import pipeline enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportPolicy {
    private_key_import: bool,
}

impl ImportPolicy {
    /// Policy that accepts private-key imports
    pub fn permissive() -> Self {
        Self {
            private_key_import: true,
        }
    }

    /// Policy that rejects private-key imports
    pub fn restrictive() -> Self {
        Self {
            private_key_import: false,
        }
    }

    pub fn from_config(config: &CspConfig) -> Self {
        Self {
            private_key_import: config.private_key_import,
        }
    }

    pub fn private_key_import_enabled(&self) -> bool {
        self.private_key_import
    }

    /// Fail unless private-key import is permitted
    pub fn enforce_private_key_import(&self, variant: ImportVariant) -> ImportResult<()> {
        if !self.private_key_import {
            log::warn!("Rejected {} import: private key import disabled", variant);
            return Err(ImportError::policy_violation(
                variant,
                "private key import disabled",
            ));
        }
        Ok(())
    }
}
