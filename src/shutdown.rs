//! Process-wide shutdown coordination.
//! Provides a flag set by the ctrlc handler so the engines can stop between
//! pairs and between transferred entries.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way "stop" flag.
//! - `request()` is safe to call from signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::RelinkError;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Request a cooperative shutdown (idempotent).
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Check whether a shutdown has been requested.
#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Return `Interrupted` if a shutdown has been requested.
#[inline]
pub fn check() -> Result<(), RelinkError> {
    if is_requested() {
        Err(RelinkError::Interrupted)
    } else {
        Ok(())
    }
}

/// Test/utility-only: clear the shutdown flag.
#[inline]
pub fn reset() {
    SHUTDOWN.store(false, Ordering::Relaxed);
}
