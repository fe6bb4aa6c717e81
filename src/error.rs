/*!
 * Error types for the key import pipeline
 *
 * Every failure the pipeline can report is one of a small, closed set of
 * kinds. Each error carries the import variant that was being processed and,
 * for HSM failures, the operation that failed, so that callers can act on it.
 * No error ever carries private key bytes.
 */

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::import::ImportVariant;

/// Error returned by every import operation
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid Opts parameter: {reason}")]
    InvalidOpts { reason: String, error_code: u32 },

    #[error("[{variant}] Invalid raw material: {reason}")]
    InvalidRaw {
        variant: ImportVariant,
        reason: String,
        error_code: u32,
    },

    #[error("[{variant}] Failed decoding {encoding}: {cause}")]
    DecodeFailure {
        variant: ImportVariant,
        encoding: &'static str,
        cause: String,
        error_code: u32,
    },

    #[error("[{variant}] Unsupported algorithm {found}: {expected}")]
    UnsupportedAlgorithm {
        variant: ImportVariant,
        expected: String,
        found: String,
        error_code: u32,
    },

    #[error("[{variant}] Security policy violation: {details}")]
    PolicyViolation {
        variant: ImportVariant,
        details: String,
        error_code: u32,
    },

    #[error("[{variant}] HSM operation '{operation}' failed: {cause}")]
    HsmFailure {
        variant: ImportVariant,
        operation: String,
        cause: String,
        error_code: u32,
    },
}

/// Error kinds, one per failure class of the import pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidOpts,
    InvalidRaw,
    DecodeFailure,
    UnsupportedAlgorithm,
    PolicyViolation,
    HsmFailure,
    ResourceError,
}

/// Error code constants for the different error categories
pub mod error_codes {
    // Argument errors: 1000-1999
    pub const OPTS_MISSING: u32 = 1001;
    pub const RAW_MISSING: u32 = 1101;
    pub const RAW_EMPTY: u32 = 1102;
    pub const RAW_WRONG_SHAPE: u32 = 1103;

    // Decoding errors: 2000-2999
    pub const PKIX_DECODE_FAILED: u32 = 2001;
    pub const PRIVATE_KEY_DECODE_FAILED: u32 = 2002;
    pub const CERTIFICATE_KEY_DECODE_FAILED: u32 = 2003;
    pub const PUBLIC_POINT_INVALID: u32 = 2004;

    // Algorithm errors: 3000-3999
    pub const NOT_ECDSA: u32 = 3001;
    pub const UNSUPPORTED_CURVE: u32 = 3002;
    pub const NOT_ECDSA_OR_RSA: u32 = 3003;

    // Policy errors: 5000-5999
    pub const PRIVATE_IMPORT_DISABLED: u32 = 5001;

    // HSM errors: 7000-7999
    pub const HSM_SESSION_UNAVAILABLE: u32 = 7001;
    pub const HSM_OBJECT_CREATION_FAILED: u32 = 7002;
    pub const HSM_NOT_CONFIGURED: u32 = 7003;
    pub const HSM_POOL_MISCONFIGURED: u32 = 7004;
}

impl ImportError {
    /// Get the numeric error code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            ImportError::InvalidOpts { error_code, .. } => *error_code,
            ImportError::InvalidRaw { error_code, .. } => *error_code,
            ImportError::DecodeFailure { error_code, .. } => *error_code,
            ImportError::UnsupportedAlgorithm { error_code, .. } => *error_code,
            ImportError::PolicyViolation { error_code, .. } => *error_code,
            ImportError::HsmFailure { error_code, .. } => *error_code,
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidOpts { .. } => ErrorKind::InvalidOpts,
            ImportError::InvalidRaw { .. } => ErrorKind::InvalidRaw,
            ImportError::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            ImportError::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
            ImportError::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            ImportError::HsmFailure { .. } => ErrorKind::HsmFailure,
        }
    }

    /// Get the error category as a string
    pub fn error_type(&self) -> &'static str {
        match self {
            ImportError::InvalidOpts { .. } => "InvalidOpts",
            ImportError::InvalidRaw { .. } => "InvalidRaw",
            ImportError::DecodeFailure { .. } => "DecodeFailure",
            ImportError::UnsupportedAlgorithm { .. } => "UnsupportedAlgorithm",
            ImportError::PolicyViolation { .. } => "PolicyViolation",
            ImportError::HsmFailure { .. } => "HsmFailure",
        }
    }

    /// The import variant the error was raised for, if one was selected
    pub fn variant(&self) -> Option<ImportVariant> {
        match self {
            ImportError::InvalidOpts { .. } => None,
            ImportError::InvalidRaw { variant, .. }
            | ImportError::DecodeFailure { variant, .. }
            | ImportError::UnsupportedAlgorithm { variant, .. }
            | ImportError::PolicyViolation { variant, .. }
            | ImportError::HsmFailure { variant, .. } => Some(*variant),
        }
    }

    /// Get technical details for debugging
    pub fn technical_details(&self) -> HashMap<String, String> {
        let mut details = HashMap::new();

        details.insert("error_code".to_string(), self.error_code().to_string());
        details.insert("error_type".to_string(), self.error_type().to_string());
        if let Some(variant) = self.variant() {
            details.insert("variant".to_string(), variant.to_string());
        }

        match self {
            ImportError::InvalidOpts { reason, .. } | ImportError::InvalidRaw { reason, .. } => {
                details.insert("reason".to_string(), reason.clone());
            }
            ImportError::DecodeFailure {
                encoding, cause, ..
            } => {
                details.insert("encoding".to_string(), encoding.to_string());
                details.insert("cause".to_string(), cause.clone());
            }
            ImportError::UnsupportedAlgorithm {
                expected, found, ..
            } => {
                details.insert("expected".to_string(), expected.clone());
                details.insert("found".to_string(), found.clone());
            }
            ImportError::PolicyViolation { details: d, .. } => {
                details.insert("policy_details".to_string(), d.clone());
            }
            ImportError::HsmFailure {
                operation, cause, ..
            } => {
                details.insert("operation".to_string(), operation.clone());
                details.insert("cause".to_string(), cause.clone());
            }
        }

        details
    }
}

/// Convenience constructors for common error types
impl ImportError {
    pub fn invalid_opts(reason: &str) -> Self {
        ImportError::InvalidOpts {
            reason: reason.to_string(),
            error_code: error_codes::OPTS_MISSING,
        }
    }

    pub fn invalid_raw(variant: ImportVariant, reason: &str, error_code: u32) -> Self {
        ImportError::InvalidRaw {
            variant,
            reason: reason.to_string(),
            error_code,
        }
    }

    pub fn decode_failure(
        variant: ImportVariant,
        encoding: &'static str,
        cause: &str,
        error_code: u32,
    ) -> Self {
        ImportError::DecodeFailure {
            variant,
            encoding,
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn unsupported_algorithm(
        variant: ImportVariant,
        expected: &str,
        found: &str,
        error_code: u32,
    ) -> Self {
        ImportError::UnsupportedAlgorithm {
            variant,
            expected: expected.to_string(),
            found: found.to_string(),
            error_code,
        }
    }

    pub fn policy_violation(variant: ImportVariant, details: &str) -> Self {
        ImportError::PolicyViolation {
            variant,
            details: details.to_string(),
            error_code: error_codes::PRIVATE_IMPORT_DISABLED,
        }
    }

    pub fn hsm_failure(variant: ImportVariant, operation: &str, cause: &str, error_code: u32) -> Self {
        ImportError::HsmFailure {
            variant,
            operation: operation.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    /// Wrap a gateway error raised while importing under `variant`
    pub fn from_gateway(variant: ImportVariant, err: GatewayError) -> Self {
        match err {
            GatewayError::Resource(ResourceError::Exhausted { timeout }) => ImportError::hsm_failure(
                variant,
                "acquire_session",
                &format!("session unavailable after {:?}", timeout),
                error_codes::HSM_SESSION_UNAVAILABLE,
            ),
            GatewayError::Resource(ResourceError::NotConfigured) => ImportError::hsm_failure(
                variant,
                "acquire_session",
                "session unavailable: no HSM session gateway configured",
                error_codes::HSM_NOT_CONFIGURED,
            ),
            GatewayError::Resource(e @ ResourceError::InvalidPoolConfig { .. }) => {
                ImportError::hsm_failure(
                    variant,
                    "acquire_session",
                    &e.to_string(),
                    error_codes::HSM_POOL_MISCONFIGURED,
                )
            }
            GatewayError::Device(e @ HsmError::Session { .. }) => ImportError::hsm_failure(
                variant,
                e.operation(),
                &format!("session unavailable: {}", e),
                error_codes::HSM_SESSION_UNAVAILABLE,
            ),
            GatewayError::Device(e) => ImportError::hsm_failure(
                variant,
                e.operation(),
                &e.to_string(),
                error_codes::HSM_OBJECT_CREATION_FAILED,
            ),
        }
    }
}

/// Error raised by the session pool when a session cannot be handed out
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("No HSM session became available within {timeout:?}")]
    Exhausted { timeout: Duration },

    #[error("Invalid session pool configuration: {parameter} - {reason}")]
    InvalidPoolConfig { parameter: String, reason: String },

    #[error("No HSM session gateway configured")]
    NotConfigured,
}

impl ResourceError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ResourceError
    }
}

/// Error raised by an HSM session or its provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HsmError {
    #[error("HSM device error during {operation}: {cause}")]
    Device { operation: String, cause: String },

    #[error("HSM session error during {operation}: {cause}")]
    Session { operation: String, cause: String },

    #[error("HSM cannot store this key: {0}")]
    UnsupportedKey(String),
}

impl HsmError {
    pub fn device(operation: &str, cause: &str) -> Self {
        HsmError::Device {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn session(operation: &str, cause: &str) -> Self {
        HsmError::Session {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// The HSM operation the error was raised from
    pub fn operation(&self) -> &str {
        match self {
            HsmError::Device { operation, .. } | HsmError::Session { operation, .. } => operation,
            HsmError::UnsupportedKey(_) => "create_private_key",
        }
    }
}

/// Error surfaced at the HSM gateway seam
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Device(#[from] HsmError),
}

/// Error raised by operations on an imported key
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key {ski} cannot be exported: {reason}")]
    NotExportable { ski: String, reason: String },

    #[error("Failed encoding key as {0}")]
    Encoding(String),
}

/// Result type alias for import operations
pub type ImportResult<T> = Result<T, ImportError>;
