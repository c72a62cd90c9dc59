//! CPU affinity for the audio callback thread
//!
//! Pinning the callback to the cores the OS reserves for the foreground app
//! avoids underruns caused by migrations to slower or more contended cores.
//! Pinning happens lazily on the callback thread itself, at most once per
//! engine instance, and a failure is only ever logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{AudioError, ErrorCode};

/// Largest core id (exclusive) a CPU set can hold on this platform
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAX_CPU_ID: usize = libc::CPU_SETSIZE as usize;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAX_CPU_ID: usize = 1024;

/// One-shot affinity setter shared between an engine and its callbacks
///
/// The `applied` flag belongs to the engine, so a stream reopened after
/// `stop`/`start` does not pin again.
#[derive(Debug, Clone)]
pub struct ThreadAffinity {
    cpu_ids: Arc<[usize]>,
    applied: Arc<AtomicBool>,
}

impl ThreadAffinity {
    pub fn new(cpu_ids: Vec<usize>, applied: Arc<AtomicBool>) -> Self {
        Self {
            cpu_ids: cpu_ids.into(),
            applied,
        }
    }

    pub fn cpu_ids(&self) -> &[usize] {
        &self.cpu_ids
    }

    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::Acquire)
    }

    /// Pin the calling thread on the first call; later calls do nothing
    ///
    /// # Returns
    /// `None` if affinity was already handled, otherwise the outcome of the
    /// attempt. Failures are logged here; callers may ignore the result.
    pub fn apply_once(&self) -> Option<Result<Vec<usize>, AudioError>> {
        if self.applied.swap(true, Ordering::AcqRel) {
            return None;
        }

        let result = pin_current_thread(&self.cpu_ids);
        match &result {
            Ok(cores) => info!("Thread affinity set to cores {:?}", cores),
            Err(err) => warn!("{}; continuing without affinity", err.message()),
        }
        Some(result)
    }
}

/// Drop ids that do not fit in a CPU set
pub fn valid_core_ids(cpu_ids: &[usize]) -> Vec<usize> {
    cpu_ids
        .iter()
        .copied()
        .filter(|&id| {
            let valid = id < MAX_CPU_ID;
            if !valid {
                warn!("Ignoring CPU ID {} (max {})", id, MAX_CPU_ID - 1);
            }
            valid
        })
        .collect()
}

/// Core the calling thread is running on right now
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn current_cpu() -> Option<usize> {
    // SAFETY: sched_getcpu has no preconditions
    let cpu = unsafe { libc::sched_getcpu() };
    usize::try_from(cpu).ok()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn current_cpu() -> Option<usize> {
    None
}

/// Bind the calling thread to `cpu_ids`, or to its current core if none are valid
///
/// # Returns
/// The core set actually requested.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn pin_current_thread(cpu_ids: &[usize]) -> Result<Vec<usize>, AudioError> {
    let mut cores = valid_core_ids(cpu_ids);
    if cores.is_empty() {
        let current = current_cpu().ok_or_else(|| AudioError::AffinityFailed {
            errno: last_errno(),
        })?;
        debug!("Current CPU ID is {}", current);
        cores.push(current);
    } else {
        for id in &cores {
            debug!("CPU ID {} added to cores set", id);
        }
    }

    // SAFETY: cpu_set_t is plain data, every id is below CPU_SETSIZE and
    // pid 0 addresses the calling thread.
    let result = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        for &id in &cores {
            libc::CPU_SET(id, &mut set);
        }
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };

    if result == 0 {
        Ok(cores)
    } else {
        Err(AudioError::AffinityFailed {
            errno: last_errno(),
        })
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn pin_current_thread(_cpu_ids: &[usize]) -> Result<Vec<usize>, AudioError> {
    Err(AudioError::Unsupported {
        operation: "Thread affinity".to_string(),
    })
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}
