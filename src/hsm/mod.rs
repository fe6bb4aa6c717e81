/*!
 * Hardware Security Module (HSM) session gateway
 *
 * The import pipeline never talks to a device directly. It hands a
 * [`PrivateKeyMaterial`] to an [`HsmGateway`], which borrows a session from a
 * bounded pool, creates a non-extractable private key object, and gives the
 * session back. Only the resulting [`HsmHandle`] survives the call.
 *
 * Device access is split in two traits:
 *
 * - [`SessionProvider`] opens and health-checks sessions. One provider is
 *   shared by every thread.
 * - [`HsmSession`] is one open, logged-in session. It is never used by two
 *   threads at once; the pool hands each session to a single caller at a time.
 */

use std::fmt;

use crate::error::{GatewayError, HsmError};
use crate::key::{EcdsaCurve, Ski};
use crate::secure_memory::SecureBytes;

pub mod mock;
#[cfg(feature = "pkcs11")]
pub mod pkcs11;
pub mod pool;

pub use self::mock::MockSessionProvider;
#[cfg(feature = "pkcs11")]
pub use self::pkcs11::Pkcs11SessionProvider;
pub use self::pool::{PooledSession, SessionPool};

/// Reference to a key object stored inside the HSM
///
/// Carries enough context to address the object again in later operations:
/// the slot it lives in, its `CKA_ID`, and its `CKA_LABEL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HsmHandle {
    slot: u64,
    key_id: Vec<u8>,
    label: String,
}

impl HsmHandle {
    pub fn new(slot: u64, key_id: Vec<u8>, label: String) -> Self {
        Self { slot, key_id, label }
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    /// Object identifier (`CKA_ID`)
    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }

    /// Object label (`CKA_LABEL`)
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Private key material handed to the HSM for a single object creation
///
/// The scalar is held in [`SecureBytes`] and wiped when the material is
/// dropped. `Debug` never prints it.
pub struct PrivateKeyMaterial {
    curve: EcdsaCurve,
    scalar: SecureBytes,
    public_point: Vec<u8>,
    ski: Ski,
    ephemeral: bool,
}

impl PrivateKeyMaterial {
    /// Build material from a scalar and its uncompressed public point
    pub fn new(curve: EcdsaCurve, scalar: SecureBytes, public_point: Vec<u8>, ski: Ski, ephemeral: bool) -> Self {
        Self {
            curve,
            scalar,
            public_point,
            ski,
            ephemeral,
        }
    }

    pub fn curve(&self) -> EcdsaCurve {
        self.curve
    }

    /// Big-endian private scalar, `curve().scalar_len()` bytes long
    pub fn scalar(&self) -> &[u8] {
        self.scalar.as_bytes()
    }

    /// Uncompressed SEC1 point of the matching public key
    pub fn public_point(&self) -> &[u8] {
        &self.public_point
    }

    pub fn ski(&self) -> &Ski {
        &self.ski
    }

    /// Session-only object instead of a token object
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("curve", &self.curve)
            .field("scalar", &"[REDACTED]")
            .field("ski", &self.ski)
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}

/// One open, authenticated HSM session
///
/// Implementations need not be reentrant. A session is only ever driven by
/// the thread that currently holds it.
pub trait HsmSession: Send + 'static {
    /// Store `material` as a sensitive, non-extractable private key object
    fn create_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<HsmHandle, HsmError>;
}

/// Opens sessions against one HSM slot
pub trait SessionProvider: Send + Sync + 'static {
    type Session: HsmSession;

    fn open_session(&self) -> Result<Self::Session, HsmError>;

    /// Cheap liveness probe run before a pooled session is reused
    fn check_session(&self, _session: &mut Self::Session) -> Result<(), HsmError> {
        Ok(())
    }
}

/// What the import pipeline needs from the HSM
///
/// Acquisition, use and release happen inside one call, so a session can
/// never leak out of an import, whichever way the import ends.
pub trait HsmGateway: Send + Sync {
    fn create_non_extractable_private_key(
        &self,
        material: &PrivateKeyMaterial,
    ) -> Result<HsmHandle, GatewayError>;
}
