//! Liveness flag for async completions
//!
//! A screen hands a clone of its [`Liveness`] to every request it starts and
//! calls [`Liveness::teardown`] when it unmounts. Completions check
//! [`Liveness::is_alive`] before touching screen state, so a response that
//! arrives after teardown is dropped instead of applied to stale data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared alive/dead flag; clones observe the same state.
///
/// # Example
/// ```
/// use lobster::util::liveness::Liveness;
///
/// let screen = Liveness::new();
/// let request = screen.clone();
/// assert!(request.is_alive());
///
/// screen.teardown();
/// assert!(!request.is_alive());
/// ```
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the owner as gone. Irreversible.
    #[inline]
    pub fn teardown(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Put a fresh flag in `slot` and tear down the one it replaces, so at
    /// most one task per slot keeps running.
    pub fn renew(slot: &mut Option<Liveness>) -> Liveness {
        let fresh = Liveness::new();
        if let Some(previous) = slot.replace(fresh.clone()) {
            previous.teardown();
        }
        fresh
    }
}
