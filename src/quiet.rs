//! Scoped suppression of log output.

use tracing::dispatcher::DefaultGuard;
use tracing::subscriber::NoSubscriber;

/// Silences `tracing` output on the current thread while alive
///
/// The guard installs a [NoSubscriber] as the thread-local default dispatcher and restores the
/// previous one when dropped, including on early return or unwinding. Threads spawned while the
/// guard is alive do not inherit it, so every sampler worker acquires its own.
#[derive(Debug)]
#[must_use = "logging is restored as soon as the guard is dropped"]
pub struct QuietGuard {
    guard: Option<DefaultGuard>,
}

impl QuietGuard {
    /// Silence logging unconditionally
    pub fn new() -> Self {
        Self {
            guard: Some(tracing::subscriber::set_default(NoSubscriber::default())),
        }
    }

    /// Silence logging unless `verbose` is set, otherwise the guard is a no-op
    pub fn unless(verbose: bool) -> Self {
        if verbose {
            Self { guard: None }
        } else {
            Self::new()
        }
    }

    /// Whether this guard suppresses anything
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }
}

impl Default for QuietGuard {
    fn default() -> Self {
        Self::new()
    }
}
