//! Reactor completion gate.
//!
//! Decides which module of a multi-module build finalizes the deploy, and
//! lets that module wait until every sibling has reported its outcome.
//! Each module owns a slot keyed by its name; the finalizer blocks on a
//! condition variable with a bounded timeout instead of polling.

use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use nexstage_util::errors::{NexstageError, NexstageResult};

/// How a module's per-module deploy step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOutcome {
    Success,
    Failure,
}

/// What the finalizing module should do once its siblings are done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// All siblings reported; remote staging may run.
    Proceed,
    /// These modules failed and failure detection is enabled.
    EarlierFailures(Vec<String>),
}

/// Completion gate over the modules of one reactor build.
#[derive(Debug)]
pub struct ReactorGate {
    order: Vec<String>,
    participants: Vec<String>,
    detect_failures: bool,
    outcomes: Mutex<BTreeMap<String, ModuleOutcome>>,
    reported: Condvar,
}

impl ReactorGate {
    /// A gate where every module takes part in deploying.
    pub fn new(modules: Vec<String>) -> Self {
        let participants = modules.clone();
        Self::with_participants(modules, participants)
    }

    /// A gate where only `participants` run the deploy logic. Every module in
    /// `order` still has to report before the finalizer proceeds.
    pub fn with_participants(order: Vec<String>, participants: Vec<String>) -> Self {
        Self {
            order,
            participants,
            detect_failures: true,
            outcomes: Mutex::new(BTreeMap::new()),
            reported: Condvar::new(),
        }
    }

    /// Disable (or re-enable) blocking remote staging after a sibling failed,
    /// for fail-at-end builds.
    pub fn detect_build_failures(mut self, detect: bool) -> Self {
        self.detect_failures = detect;
        self
    }

    /// Whether `module` is the last participating module in reactor order.
    pub fn is_last(&self, module: &str) -> bool {
        self.order
            .iter()
            .rev()
            .find(|m| self.participants.contains(m))
            .is_some_and(|last| last == module)
    }

    /// Record the outcome of `module` and wake any waiting finalizer.
    pub fn record(&self, module: &str, outcome: ModuleOutcome) -> NexstageResult<()> {
        if !self.order.iter().any(|m| m == module) {
            return Err(NexstageError::Reactor {
                message: format!("Module '{module}' is not part of this reactor"),
            });
        }
        let mut outcomes = self.lock()?;
        outcomes.insert(module.to_string(), outcome);
        drop(outcomes);
        self.reported.notify_all();
        Ok(())
    }

    /// Block until every module other than `module` has reported, or until
    /// `timeout` elapses.
    pub fn await_others(&self, module: &str, timeout: Duration) -> NexstageResult<GateVerdict> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = self.lock()?;
        loop {
            let pending = self.pending(&outcomes, module);
            if pending.is_empty() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(NexstageError::Reactor {
                    message: format!(
                        "Timed out after {}s waiting for modules: {}",
                        timeout.as_secs(),
                        pending.join(", ")
                    ),
                });
            }
            tracing::debug!("Waiting for {} module(s) to finish", pending.len());
            let (guard, _) = self
                .reported
                .wait_timeout(outcomes, deadline - now)
                .map_err(|_| poisoned())?;
            outcomes = guard;
        }

        let failed: Vec<String> = self
            .order
            .iter()
            .filter(|m| m.as_str() != module)
            .filter(|m| outcomes.get(m.as_str()) == Some(&ModuleOutcome::Failure))
            .cloned()
            .collect();

        if failed.is_empty() || !self.detect_failures {
            if !failed.is_empty() {
                tracing::warn!(
                    "Ignoring failed modules ({}) because build failure detection is off",
                    failed.join(", ")
                );
            }
            Ok(GateVerdict::Proceed)
        } else {
            Ok(GateVerdict::EarlierFailures(failed))
        }
    }

    fn pending(&self, outcomes: &BTreeMap<String, ModuleOutcome>, module: &str) -> Vec<String> {
        self.order
            .iter()
            .filter(|m| m.as_str() != module && !outcomes.contains_key(m.as_str()))
            .cloned()
            .collect()
    }

    fn lock(&self) -> NexstageResult<MutexGuard<'_, BTreeMap<String, ModuleOutcome>>> {
        self.outcomes.lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> NexstageError {
    NexstageError::Reactor {
        message: "A module panicked while holding the reactor gate".to_string(),
    }
}
