/*!
 * In-process session provider that records what it is asked to do
 *
 * Nothing is stored except the SKIs of created objects. Clones share their
 * counters, so a test can keep one clone and move another into a pool.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{HsmHandle, HsmSession, PrivateKeyMaterial, SessionProvider};
use crate::error::HsmError;
use crate::key::Ski;

#[derive(Debug, Default)]
struct MockState {
    sessions_opened: AtomicUsize,
    create_calls: AtomicUsize,
    in_use: AtomicUsize,
    max_in_use: AtomicUsize,
    created: Mutex<Vec<Ski>>,
}

/// Recording [`SessionProvider`] for tests and demos
#[derive(Debug, Clone)]
pub struct MockSessionProvider {
    slot: u64,
    latency: Duration,
    failure: Option<String>,
    open_failure: Option<String>,
    state: Arc<MockState>,
}

impl MockSessionProvider {
    pub fn new() -> Self {
        Self {
            slot: 0,
            latency: Duration::ZERO,
            failure: None,
            open_failure: None,
            state: Arc::new(MockState::default()),
        }
    }

    /// Every object creation fails with a device error carrying `cause`
    pub fn failing(cause: &str) -> Self {
        Self {
            failure: Some(cause.to_string()),
            ..Self::new()
        }
    }

    /// Every session open fails with a session error carrying `cause`
    pub fn unavailable(cause: &str) -> Self {
        Self {
            open_failure: Some(cause.to_string()),
            ..Self::new()
        }
    }

    /// Hold each session for `latency` while creating an object
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_slot(mut self, slot: u64) -> Self {
        self.slot = slot;
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of object creations attempted, failed ones included
    pub fn create_calls(&self) -> usize {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were creating objects at the same time
    pub fn max_concurrent_sessions(&self) -> usize {
        self.state.max_in_use.load(Ordering::SeqCst)
    }

    /// SKIs of the objects created so far
    pub fn created_skis(&self) -> Vec<Ski> {
        self.state.created.lock().clone()
    }
}

impl Default for MockSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for MockSessionProvider {
    type Session = MockSession;

    fn open_session(&self) -> Result<MockSession, HsmError> {
        if let Some(cause) = &self.open_failure {
            return Err(HsmError::session("open_session", cause));
        }
        let id = self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        log::debug!("Mock HSM opened session {} on slot {}", id, self.slot);
        Ok(MockSession {
            id,
            slot: self.slot,
            latency: self.latency,
            failure: self.failure.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

/// Session handed out by [`MockSessionProvider`]
#[derive(Debug)]
pub struct MockSession {
    id: usize,
    slot: u64,
    latency: Duration,
    failure: Option<String>,
    state: Arc<MockState>,
}

impl MockSession {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl HsmSession for MockSession {
    fn create_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<HsmHandle, HsmError> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);

        let in_use = self.state.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_use.fetch_max(in_use, Ordering::SeqCst);
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.state.in_use.fetch_sub(1, Ordering::SeqCst);

        if let Some(cause) = &self.failure {
            return Err(HsmError::device("create_object", cause));
        }
        if material.scalar().len() != material.curve().scalar_len() {
            return Err(HsmError::UnsupportedKey(format!(
                "{} scalar must be {} bytes",
                material.curve(),
                material.curve().scalar_len()
            )));
        }

        let ski = *material.ski();
        self.state.created.lock().push(ski);
        Ok(HsmHandle::new(self.slot, ski.as_bytes().to_vec(), ski.to_hex()))
    }
}
