use crate::services::ProcessRegistry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

pub struct AppStateInner {
    pub registry: ProcessRegistry,
}

pub type AppState = Arc<Mutex<AppStateInner>>;

pub fn new_state(registry: ProcessRegistry) -> AppState {
    Arc::new(Mutex::new(AppStateInner { registry }))
}

/// Locks the state, recovering it if a previous holder panicked.
pub fn lock_state(state: &AppState) -> MutexGuard<'_, AppStateInner> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Like [`lock_state`], but returns `None` while another holder has the lock.
pub fn try_lock_state(state: &AppState) -> Option<MutexGuard<'_, AppStateInner>> {
    match state.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// Adapter settings that do not change at runtime.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Upper bound for one collection pass, including pattern searches.
    pub collect_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collect_timeout: Duration::from_secs(10),
        }
    }
}
