//! Accelerator memory arbiter.
//!
//! Heavy model workloads (LLM inference, speech synthesis, video
//! diffusion) declare an estimated VRAM cost before starting. The
//! arbiter admits them against a fixed budget and hands back a ticket
//! that releases the reservation when dropped, so a panicking or
//! early-returning caller can never leak its share.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;

/// Errors from reservation requests.
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// The requested cost does not fit, even after a forced clear.
    #[error("workload '{name}' needs {cost_mb} MB but only {available_mb} MB of {budget_mb} MB budget is free")]
    Busy {
        name: String,
        cost_mb: u64,
        available_mb: u64,
        budget_mb: u64,
    },

    /// The requested cost exceeds the total budget and can never fit.
    #[error("workload '{name}' needs {cost_mb} MB, more than the whole {budget_mb} MB budget")]
    OverBudget {
        name: String,
        cost_mb: u64,
        budget_mb: u64,
    },
}

#[derive(Debug)]
struct Workload {
    name: String,
    cost_mb: u64,
    started: Instant,
}

/// Admission controller for accelerator memory.
///
/// The budget should be the physical VRAM minus a safety margin; the
/// arbiter tracks declared costs, not actual allocations.
#[derive(Debug)]
pub struct VramArbiter {
    budget_mb: u64,
    next_id: AtomicU64,
    inner: Mutex<HashMap<u64, Workload>>,
}

impl VramArbiter {
    pub fn new(budget_mb: u64) -> Self {
        Self {
            budget_mb,
            next_id: AtomicU64::new(1),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Total budget in megabytes.
    pub fn budget_mb(&self) -> u64 {
        self.budget_mb
    }

    /// Megabytes not currently reserved.
    pub fn available_mb(&self) -> u64 {
        let held: u64 = self.lock().values().map(|w| w.cost_mb).sum();
        self.budget_mb.saturating_sub(held)
    }

    /// Whether a workload of `cost_mb` would be admitted right now.
    pub fn can_fit(&self, cost_mb: u64) -> bool {
        cost_mb <= self.available_mb()
    }

    /// Reserve `cost_mb` for a named workload.
    ///
    /// Only one accelerator-heavy phase runs at a time by design, so a
    /// request for more than half the remaining budget treats whatever
    /// is still reserved as stale and clears it before re-checking.
    pub fn acquire(
        self: &Arc<Self>,
        name: &str,
        cost_mb: u64,
    ) -> Result<VramTicket, ArbiterError> {
        if cost_mb > self.budget_mb {
            return Err(ArbiterError::OverBudget {
                name: name.to_string(),
                cost_mb,
                budget_mb: self.budget_mb,
            });
        }

        if cost_mb * 2 > self.available_mb() {
            self.force_clear();
        }

        let mut inner = self.lock();
        let held: u64 = inner.values().map(|w| w.cost_mb).sum();
        let available = self.budget_mb.saturating_sub(held);
        if cost_mb > available {
            return Err(ArbiterError::Busy {
                name: name.to_string(),
                cost_mb,
                available_mb: available,
                budget_mb: self.budget_mb,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        inner.insert(
            id,
            Workload {
                name: name.to_string(),
                cost_mb,
                started: Instant::now(),
            },
        );
        Ok(VramTicket {
            arbiter: Arc::clone(self),
            id,
        })
    }

    /// Drop every reservation. Outstanding tickets stay valid; their
    /// eventual release of an already-cleared id is a no-op.
    pub fn force_clear(&self) {
        self.lock().clear();
    }

    /// Names and held costs of current workloads, oldest first.
    pub fn active_workloads(&self) -> Vec<(String, u64)> {
        let inner = self.lock();
        let mut entries: Vec<_> = inner.values().collect();
        entries.sort_by_key(|w| w.started);
        entries
            .into_iter()
            .map(|w| (w.name.clone(), w.cost_mb))
            .collect()
    }

    fn release(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Workload>> {
        // Reservation state stays consistent even if a holder panicked.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A held reservation. Releases its share when dropped.
#[derive(Debug)]
pub struct VramTicket {
    arbiter: Arc<VramArbiter>,
    id: u64,
}

impl Drop for VramTicket {
    fn drop(&mut self) {
        self.arbiter.release(self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
