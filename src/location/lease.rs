//! Scoped background-execution leases.
//!
//! While the host process can be suspended by the OS at any moment after
//! leaving the foreground, each durable sample write is bracketed by a
//! lease: acquired before the write begins, released only once the write
//! has completed. The guard releases on drop, so every exit path of the
//! write task — success or failure — hands the lease back.

use log::warn;

/// Host-provided source of background-execution grants.
pub trait LeaseProvider: Send + Sync {
    fn acquire(&self, name: &str) -> BackgroundLease;
}

/// RAII guard for one background-execution grant. Dropping the guard
/// releases the grant; leases for separate writes may overlap and do not
/// serialize the writes against each other.
pub struct BackgroundLease {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl BackgroundLease {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A lease that holds nothing, for hosts without suspension
    /// semantics.
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for BackgroundLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Provider for environments where the process cannot be suspended
/// mid-write (tests, desktop hosts).
pub struct NoopLeaseProvider;

impl LeaseProvider for NoopLeaseProvider {
    fn acquire(&self, name: &str) -> BackgroundLease {
        let _ = name;
        BackgroundLease::noop()
    }
}

/// Fallback used if a host forgets to wire a provider on a platform that
/// does suspend; logs once per acquisition so the gap is visible.
pub struct WarnOnAcquireProvider;

impl LeaseProvider for WarnOnAcquireProvider {
    fn acquire(&self, name: &str) -> BackgroundLease {
        warn!("no background-execution lease provider wired; write '{name}' is unprotected");
        BackgroundLease::noop()
    }
}
