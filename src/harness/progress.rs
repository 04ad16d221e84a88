// ============================================================
// Layer 5 — Run Progress and Cancellation
// ============================================================
// Lock-free counters shared between the workers and the
// collecting thread. Every job moves through:
//
//   pending ──dispatched──► running ──finished──► succeeded | failed | skipped
//      │                                                       ▲
//      └────────────── skipped_undispatched ───────────────────┘
//
// Run-level phase:
//
//   Idle → Dispatching → Draining → Done
//
//   Dispatching: queue still has work
//   Draining:    queue empty (or cancelled), in-flight jobs finishing
//   Done:        every job has a terminal status

use std::sync::{
    atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
    Arc,
};
use std::fmt;

use crate::domain::job::JobStatus;

// ─── RunPhase ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunPhase {
    Idle        = 0,
    Dispatching = 1,
    Draining    = 2,
    Done        = 3,
}

impl RunPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => RunPhase::Dispatching,
            2 => RunPhase::Draining,
            3 => RunPhase::Done,
            _ => RunPhase::Idle,
        }
    }
}

// ─── ProgressTracker ──────────────────────────────────────────────────────────
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total:     AtomicUsize,
    pending:   AtomicUsize,
    running:   AtomicUsize,
    succeeded: AtomicUsize,
    failed:    AtomicUsize,
    skipped:   AtomicUsize,
    phase:     AtomicU8,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total:     usize,
    pub pending:   usize,
    pub running:   usize,
    pub succeeded: usize,
    pub failed:    usize,
    pub skipped:   usize,
    pub phase:     RunPhase,
}

impl ProgressSnapshot {
    pub fn done(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] running={} ok={} failed={} skipped={}",
            self.done(), self.total, self.running, self.succeeded, self.failed, self.skipped
        )
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh run of `total` jobs
    pub fn reset(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.pending.store(total, Ordering::SeqCst);
        self.running.store(0, Ordering::SeqCst);
        self.succeeded.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.skipped.store(0, Ordering::SeqCst);
        self.set_phase(RunPhase::Idle);
    }

    /// A worker took a job off the queue
    pub fn dispatched(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.running.fetch_add(1, Ordering::SeqCst);
    }

    /// A running job reached its terminal status
    pub fn finished(&self, status: &JobStatus) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        let counter = match status {
            JobStatus::Succeeded => &self.succeeded,
            JobStatus::Failed(_) => &self.failed,
            JobStatus::Skipped   => &self.skipped,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// A job never dispatched because the run was cancelled
    pub fn skipped_undispatched(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn set_phase(&self, phase: RunPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total:     self.total.load(Ordering::SeqCst),
            pending:   self.pending.load(Ordering::SeqCst),
            running:   self.running.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed:    self.failed.load(Ordering::SeqCst),
            skipped:   self.skipped.load(Ordering::SeqCst),
            phase:     self.phase(),
        }
    }
}

// ─── CancelToken ──────────────────────────────────────────────────────────────
/// Cooperative stop flag. Once set, workers stop taking new
/// jobs; jobs already running are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
