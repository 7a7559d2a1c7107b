//! context.rs
//! Per-run context handed to every component at construction.
//!
//! Holds the `tracing` span components log under and the shared telemetry.
//! Nothing in the crate installs a subscriber or reaches for a global logger.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::Span;

use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};

#[derive(Default)]
struct Shared {
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

#[derive(Clone)]
pub struct Context {
    span: Span,
    shared: Arc<Mutex<Shared>>,
}

impl Context {
    /// Root context for one run.
    pub fn new(run: &str) -> Self {
        Self {
            span: tracing::info_span!("snapship", run = %run),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Context for a component; shares telemetry with `self`.
    pub fn child(&self, component: &'static str) -> Self {
        Self {
            span: tracing::info_span!(parent: &self.span, "component", name = component),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    // A panicking holder cannot leave the counters half-updated in a way that matters.
    fn lock(&self) -> MutexGuard<'_, Shared> {
        match self.shared.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn merge_counters(&self, counters: &TelemetryCounters) {
        self.lock().counters.merge(counters);
    }

    pub fn update_counters<F: FnOnce(&mut TelemetryCounters)>(&self, f: F) {
        f(&mut self.lock().counters);
    }

    pub fn add_stage_time(&self, stage: Stage, dur: Duration) {
        self.lock().timer.add_stage_time(stage, dur);
    }

    pub fn counters(&self) -> TelemetryCounters {
        self.lock().counters.clone()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        let shared = self.lock();
        TelemetrySnapshot::from(&shared.counters, &shared.timer)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new("default")
    }
}
