//! Step tracking for regression scenarios.
//!
//! A [`StepLog`] is the ordered record of every step a scenario started.
//! Each step is resolved through its [`StepTracker`]:
//!
//! ```text
//! Pending ──pass()──▶ Passed
//!    │ └───fail()──▶ Failed(reason)
//!    └──next step()─▶ Abandoned
//! ```
//!
//! The first resolution wins. Later `pass()`/`fail()` calls are ignored and
//! return `false`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Started, not yet resolved.
    Pending,
    /// Resolved successfully.
    Passed,
    /// Resolved with a failure reason.
    Failed(String),
    /// Superseded by a later step (or the end of the scenario) while pending.
    Abandoned,
}

impl StepStatus {
    /// Returns `true` unless the step is still pending.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A step as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// Time from start to resolution. `None` while pending.
    pub elapsed: Option<Duration>,
}

#[derive(Debug)]
struct Entry {
    record: StepRecord,
    started: Instant,
}

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<Entry>,
    notes: Vec<String>,
}

/// Shared, append-only log of steps and report notes.
///
/// Cloning yields another handle to the same log.
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    state: Arc<Mutex<LogState>>,
}

impl StepLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a step and returns its tracker. A still-pending previous step
    /// is marked [`StepStatus::Abandoned`].
    pub fn begin(&self, name: impl Into<String>) -> StepTracker {
        let name = name.into();
        let mut state = self.lock();

        if let Some(last) = state.entries.last_mut() {
            if last.record.status == StepStatus::Pending {
                tracing::warn!(step = %last.record.name, "Step abandoned without being resolved");
                last.record.status = StepStatus::Abandoned;
                last.record.elapsed = Some(last.started.elapsed());
            }
        }

        tracing::debug!(step = %name, "Step started");
        state.entries.push(Entry {
            record: StepRecord {
                name: name.clone(),
                status: StepStatus::Pending,
                elapsed: None,
            },
            started: Instant::now(),
        });

        StepTracker {
            log: self.clone(),
            index: state.entries.len() - 1,
            name,
        }
    }

    /// Marks every pending step abandoned.
    pub fn abandon_pending(&self) {
        let mut state = self.lock();
        for entry in state
            .entries
            .iter_mut()
            .filter(|e| e.record.status == StepStatus::Pending)
        {
            tracing::warn!(step = %entry.record.name, "Step abandoned without being resolved");
            entry.record.status = StepStatus::Abandoned;
            entry.record.elapsed = Some(entry.started.elapsed());
        }
    }

    /// Adds a free-form note to the report.
    pub fn note(&self, note: impl Into<String>) {
        self.lock().notes.push(note.into());
    }

    /// Snapshot of every step in start order.
    #[must_use]
    pub fn records(&self) -> Vec<StepRecord> {
        self.lock().entries.iter().map(|e| e.record.clone()).collect()
    }

    /// Snapshot of the report notes.
    #[must_use]
    pub fn notes(&self) -> Vec<String> {
        self.lock().notes.clone()
    }

    fn resolve(&self, index: usize, status: StepStatus) -> bool {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(index) else {
            return false;
        };

        if entry.record.status.is_resolved() {
            tracing::warn!(
                step = %entry.record.name,
                current = ?entry.record.status,
                ignored = ?status,
                "Step already resolved, ignoring"
            );
            return false;
        }

        match &status {
            StepStatus::Failed(reason) => {
                tracing::error!(step = %entry.record.name, reason = %reason, "Step failed");
            }
            _ => tracing::info!(step = %entry.record.name, "Step passed"),
        }
        entry.record.status = status;
        entry.record.elapsed = Some(entry.started.elapsed());
        true
    }

    fn status(&self, index: usize) -> StepStatus {
        self.lock()
            .entries
            .get(index)
            .map_or(StepStatus::Pending, |e| e.record.status.clone())
    }
}

/// Handle for resolving one step.
#[derive(Debug)]
#[must_use = "a step must be resolved with pass() or fail()"]
pub struct StepTracker {
    log: StepLog,
    index: usize,
    name: String,
}

impl StepTracker {
    /// Step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status of the step.
    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.log.status(self.index)
    }

    /// Marks the step passed. Returns `false` if it was already resolved.
    #[allow(clippy::must_use_candidate)]
    pub fn pass(&self) -> bool {
        self.log.resolve(self.index, StepStatus::Passed)
    }

    /// Marks the step failed. Returns `false` if it was already resolved.
    #[allow(clippy::must_use_candidate)]
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.log.resolve(self.index, StepStatus::Failed(reason.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_resolves_step() {
        let log = StepLog::new();
        let step = log.begin("Create timing diagram");
        assert_eq!(step.status(), StepStatus::Pending);
        assert!(step.pass());
        assert_eq!(step.status(), StepStatus::Passed);

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Create timing diagram");
        assert!(records[0].elapsed.is_some());
    }

    #[test]
    fn first_resolution_wins() {
        let log = StepLog::new();
        let step = log.begin("List lifelines");
        assert!(step.fail("Expected 2 lifelines, got 1"));
        assert!(!step.pass());
        assert!(!step.fail("second reason"));
        assert_eq!(
            step.status(),
            StepStatus::Failed("Expected 2 lifelines, got 1".to_string())
        );
    }

    #[test]
    fn pass_then_fail_is_ignored() {
        let log = StepLog::new();
        let step = log.begin("Delete diagram");
        assert!(step.pass());
        assert!(!step.fail("late failure"));
        assert_eq!(step.status(), StepStatus::Passed);
    }

    #[test]
    fn starting_a_step_abandons_the_pending_one() {
        let log = StepLog::new();
        let first = log.begin("first");
        let second = log.begin("second");

        assert_eq!(first.status(), StepStatus::Abandoned);
        assert!(!first.pass());
        assert!(second.pass());

        let records = log.records();
        assert_eq!(records[0].status, StepStatus::Abandoned);
        assert_eq!(records[1].status, StepStatus::Passed);
    }

    #[test]
    fn resolved_steps_are_not_abandoned() {
        let log = StepLog::new();
        let first = log.begin("first");
        assert!(first.fail("boom"));
        let _second = log.begin("second");
        assert_eq!(first.status(), StepStatus::Failed("boom".to_string()));
    }

    #[test]
    fn abandon_pending_closes_open_steps() {
        let log = StepLog::new();
        let step = log.begin("dangling");
        log.abandon_pending();
        assert_eq!(step.status(), StepStatus::Abandoned);
    }

    #[test]
    fn clones_share_the_log() {
        let log = StepLog::new();
        let other = log.clone();
        let step = other.begin("shared");
        assert!(step.pass());
        other.note("cascade not verified");
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.notes(), vec!["cascade not verified".to_string()]);
    }
}
