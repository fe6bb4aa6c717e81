//! Secure Memory Handling Utilities
//!
//! Private scalars only ever live in process memory for the duration of one
//! import call: long enough to derive the public key and hand the scalar to
//! the HSM. These containers make sure the bytes are wiped on every exit path
//! instead of lingering until the allocator reuses them.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A byte container that is zeroed when dropped.
///
/// `Debug` never prints the contents, so a `SecureBytes` can sit inside
/// structures that are logged or wrapped in errors.
///
/// # Example
///
/// ```
/// use csp_keyimport::secure_memory::SecureBytes;
///
/// let scalar = SecureBytes::new(&[0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(scalar.len(), 4);
/// assert_eq!(format!("{:?}", scalar), "SecureBytes([REDACTED; 4])");
/// // zeroed when `scalar` goes out of scope
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes {
    bytes: Vec<u8>,
}

impl SecureBytes {
    /// Create a new SecureBytes holding a copy of `data`
    pub fn new(data: &[u8]) -> Self {
        Self {
            bytes: data.to_vec(),
        }
    }

    /// Get a reference to the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Clear the buffer, securely zeroing all data
    pub fn clear(&mut self) {
        self.bytes.zeroize();
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBytes([REDACTED; {}])", self.bytes.len())
    }
}

/// Run `f` with access to `data`, zeroizing `data` afterwards.
///
/// The wipe happens when the closure returns normally, returns early through
/// `?`, or panics.
///
/// # Example
///
/// ```
/// use csp_keyimport::secure_memory::with_secure_scope;
///
/// let mut scalar = [7u8; 32];
/// let first = with_secure_scope(&mut scalar, |s| s[0]);
/// assert_eq!(first, 7);
/// assert_eq!(scalar, [0u8; 32]);
/// ```
pub fn with_secure_scope<T, F, R>(data: &mut T, f: F) -> R
where
    T: Zeroize + ?Sized,
    F: FnOnce(&mut T) -> R,
{
    struct ScopeGuard<'a, T: Zeroize + ?Sized> {
        data: &'a mut T,
    }

    impl<'a, T: Zeroize + ?Sized> Drop for ScopeGuard<'a, T> {
        fn drop(&mut self) {
            self.data.zeroize();
        }
    }

    let guard = ScopeGuard { data };
    let result = f(&mut *guard.data);
    drop(guard);
    result
}
