//! Restart coordination.
//!
//! One reader/writer lock guards the managed stack. Health checks take it
//! shared, a stack restart takes it exclusive, so a probe never observes a
//! half-restarted component and two restarts never interleave.
//!
//! ```text
//! Idle ⇄ ReadersActive(n) ⇄ Idle ⇄ WriterActive ⇄ Idle
//! ```
//!
//! Permits are owned guards released on drop: on success, on error, while
//! unwinding from a panic, and when the holding future is cancelled.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

/// Observable state of the restart lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    ReadersActive(usize),
    WriterActive,
}

#[derive(Debug, Clone, Default)]
pub struct RestartCoordinator {
    lock: Arc<RwLock<()>>,
    readers: Arc<AtomicUsize>,
    writer: Arc<AtomicBool>,
}

/// Shared acquisition held for the duration of one health check.
#[derive(Debug)]
pub struct HealthCheckPermit {
    _guard: OwnedRwLockReadGuard<()>,
    readers: Arc<AtomicUsize>,
}

/// Exclusive acquisition held for the duration of one stack restart.
#[derive(Debug)]
pub struct RestartPermit {
    _guard: OwnedRwLockWriteGuard<()>,
    writer: Arc<AtomicBool>,
}

impl RestartCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire for a health check. Waits only behind an active or queued
    /// restart.
    pub async fn acquire_for_health_check(&self) -> HealthCheckPermit {
        let guard = self.lock.clone().read_owned().await;
        self.readers.fetch_add(1, Ordering::SeqCst);
        HealthCheckPermit {
            _guard: guard,
            readers: self.readers.clone(),
        }
    }

    /// Acquire for a restart. Waits until no health check and no other
    /// restart holds the lock.
    pub async fn acquire_for_restart(&self) -> RestartPermit {
        debug!(state = ?self.state(), "waiting for restart lock");
        let guard = self.lock.clone().write_owned().await;
        self.writer.store(true, Ordering::SeqCst);
        debug!("restart lock acquired");
        RestartPermit {
            _guard: guard,
            writer: self.writer.clone(),
        }
    }

    pub fn state(&self) -> LockState {
        if self.writer.load(Ordering::SeqCst) {
            return LockState::WriterActive;
        }
        match self.readers.load(Ordering::SeqCst) {
            0 => LockState::Idle,
            n => LockState::ReadersActive(n),
        }
    }
}

impl Drop for HealthCheckPermit {
    fn drop(&mut self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for RestartPermit {
    fn drop(&mut self) {
        self.writer.store(false, Ordering::SeqCst);
        debug!("restart lock released");
    }
}
