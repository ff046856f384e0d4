//! Mutual exclusion of job families through the persisted processing flags.

use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::server_store::{JobFamily, JobFlags, ServerStore};

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("job flags record not found")]
    ConfigNotFound,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Grants at most one running job across all families.
///
/// Flags live in the server store so they are visible to every request
/// handler; the in-process lock serializes the read-check-write.
pub struct JobStateGuard {
    store: Arc<dyn ServerStore>,
    lock: Mutex<()>,
}

impl JobStateGuard {
    pub fn new(store: Arc<dyn ServerStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn flags(&self) -> Result<JobFlags, GuardError> {
        self.store
            .load_job_flags()?
            .ok_or(GuardError::ConfigNotFound)
    }

    /// Sets `family`'s flag if no flag is currently set.
    ///
    /// Returns `Ok(false)` without writing anything when any job is running.
    pub fn try_acquire(&self, family: JobFamily) -> Result<bool, GuardError> {
        let _locked = self.lock.lock().unwrap();

        let mut flags = self.flags()?;
        if flags.any_set() {
            debug!("Cannot acquire {}: flags are {:?}", family, flags);
            return Ok(false);
        }

        flags.set(family, true);
        self.store.save_job_flags(&flags)?;
        debug!("Acquired {} flag", family);
        Ok(true)
    }

    /// Clears `family`'s flag, leaving the other one as it is.
    pub fn release(&self, family: JobFamily) -> Result<(), GuardError> {
        let _locked = self.lock.lock().unwrap();

        let mut flags = self.flags()?;
        flags.set(family, false);
        self.store.save_job_flags(&flags)?;
        debug!("Released {} flag", family);
        Ok(())
    }

    /// Like [`try_acquire`](Self::try_acquire) but returns a lease that
    /// releases the flag when dropped.
    pub fn lease(self: &Arc<Self>, family: JobFamily) -> Result<Option<JobLease>, GuardError> {
        if !self.try_acquire(family)? {
            return Ok(None);
        }
        Ok(Some(JobLease {
            guard: Arc::clone(self),
            family,
        }))
    }

    /// Clears both flags, returning the values found.
    pub fn reset_stale_flags(&self) -> Result<JobFlags, GuardError> {
        let _locked = self.lock.lock().unwrap();

        let previous = self.flags()?;
        if previous.any_set() {
            info!("Clearing stale job flags {:?}", previous);
            self.store.save_job_flags(&JobFlags::default())?;
        }
        Ok(previous)
    }
}

/// An acquired job family. Dropping it releases the flag.
pub struct JobLease {
    guard: Arc<JobStateGuard>,
    family: JobFamily,
}

impl JobLease {
    pub fn family(&self) -> JobFamily {
        self.family
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        if let Err(e) = self.guard.release(self.family) {
            error!("Failed to release {} flag: {}", self.family, e);
        }
    }
}
