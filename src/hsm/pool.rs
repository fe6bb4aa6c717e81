/*!
 * Bounded HSM session pool
 *
 * Sessions are opened lazily up to `max_sessions` and handed to one caller
 * at a time. A caller that finds every session busy blocks until one is
 * returned or the acquisition timeout elapses. If sessions could not be
 * opened during that wait, the provider's last error is reported instead of
 * the timeout.
 */

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use r2d2::{ManageConnection, Pool, PooledConnection};

use super::{HsmGateway, HsmHandle, HsmSession, PrivateKeyMaterial, SessionProvider};
use crate::config::SessionPoolConfig;
use crate::error::{GatewayError, HsmError, ResourceError};

/// Adapts a [`SessionProvider`] to r2d2's connection manager
struct SessionManager<P> {
    provider: Arc<P>,
    last_open_error: Arc<Mutex<Option<HsmError>>>,
}

impl<P: SessionProvider> ManageConnection for SessionManager<P> {
    type Connection = P::Session;
    type Error = HsmError;

    fn connect(&self) -> Result<P::Session, HsmError> {
        log::trace!("Opening new HSM session");
        let result = self.provider.open_session();
        *self.last_open_error.lock() = result.as_ref().err().cloned();
        result
    }

    fn is_valid(&self, session: &mut P::Session) -> Result<(), HsmError> {
        self.provider.check_session(session)
    }

    fn has_broken(&self, _session: &mut P::Session) -> bool {
        false
    }
}

/// A session borrowed from a [`SessionPool`]
///
/// The session goes back to the pool when this guard is dropped.
pub struct PooledSession<P: SessionProvider> {
    inner: PooledConnection<SessionManager<P>>,
}

impl<P: SessionProvider> Deref for PooledSession<P> {
    type Target = P::Session;

    fn deref(&self) -> &P::Session {
        &self.inner
    }
}

impl<P: SessionProvider> DerefMut for PooledSession<P> {
    fn deref_mut(&mut self) -> &mut P::Session {
        &mut self.inner
    }
}

/// Pool of HSM sessions opened through one provider
pub struct SessionPool<P: SessionProvider> {
    pool: Pool<SessionManager<P>>,
    provider: Arc<P>,
    last_open_error: Arc<Mutex<Option<HsmError>>>,
    acquire_timeout: Duration,
}

impl<P: SessionProvider> SessionPool<P> {
    /// Build a pool. No session is opened until the first acquisition.
    pub fn new(provider: P, config: &SessionPoolConfig) -> Result<Self, ResourceError> {
        config.validate()?;

        let acquire_timeout = config.acquire_timeout();
        let provider = Arc::new(provider);
        let last_open_error = Arc::new(Mutex::new(None));
        let pool = Pool::builder()
            .max_size(config.max_sessions)
            .min_idle(Some(0))
            .connection_timeout(acquire_timeout)
            .build_unchecked(SessionManager {
                provider: Arc::clone(&provider),
                last_open_error: Arc::clone(&last_open_error),
            });

        log::info!(
            "Created HSM session pool: max_sessions={}, acquire_timeout={:?}",
            config.max_sessions,
            acquire_timeout
        );

        Ok(Self {
            pool,
            provider,
            last_open_error,
            acquire_timeout,
        })
    }

    /// Borrow a session, blocking up to the configured timeout
    ///
    /// Fails with the provider's error when the wait ended while sessions
    /// could not be opened, and with [`ResourceError::Exhausted`] when every
    /// session stayed busy.
    pub fn acquire(&self) -> Result<PooledSession<P>, GatewayError> {
        match self.pool.get() {
            Ok(inner) => Ok(PooledSession { inner }),
            Err(e) => {
                log::warn!("HSM session acquisition failed: {}", e);
                match self.last_open_error.lock().clone() {
                    Some(cause) => Err(GatewayError::Device(cause)),
                    None => Err(ResourceError::Exhausted {
                        timeout: self.acquire_timeout,
                    }
                    .into()),
                }
            }
        }
    }

    /// Explicitly return a session. Dropping the guard has the same effect.
    pub fn release(&self, session: PooledSession<P>) {
        drop(session);
    }

    /// Sessions currently open, busy or idle
    pub fn open_sessions(&self) -> u32 {
        self.pool.state().connections
    }

    pub fn idle_sessions(&self) -> u32 {
        self.pool.state().idle_connections
    }

    pub fn max_sessions(&self) -> u32 {
        self.pool.max_size()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: SessionProvider> HsmGateway for SessionPool<P> {
    fn create_non_extractable_private_key(
        &self,
        material: &PrivateKeyMaterial,
    ) -> Result<HsmHandle, GatewayError> {
        let mut session = self.acquire()?;
        let result = session.create_private_key(material);
        self.release(session);
        Ok(result?)
    }
}
