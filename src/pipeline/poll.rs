//! Poll loop and driver lifecycle.
//!
//! A [`Poller`] owns one data source's prior/current state and drives the
//! fetch → translate → diff → publish cycle. One poller is one logical
//! worker: cycles never overlap, the prior-state swap happens once at cycle
//! start, and a fetch failure is recorded and swallowed so the next tick
//! retries unconditionally against the last good state.

use crate::pipeline::publish::{PublishEngine, Publisher};
use crate::translate::registry::Registry;
use crate::types::TableState;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// One data source's fetch-and-translate step. Implementors perform the
/// network I/O; the poller never touches the network itself.
pub trait DataSource {
    /// A short name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Fetch from the external service and translate into per-table row
    /// sets. Errors are recorded by the poller and never propagate past the
    /// cycle boundary.
    fn poll_tables(&mut self) -> Result<TableState>;
}

/// A [`DataSource`] built from a [`Registry`] and a fetch function that
/// returns one raw payload per registered root table.
pub struct TranslatingSource<F> {
    name: String,
    registry: Registry,
    fetch: F,
}

impl<F> TranslatingSource<F>
where
    F: FnMut() -> Result<HashMap<String, Value>>,
{
    pub fn new(name: impl Into<String>, registry: Registry, fetch: F) -> Self {
        TranslatingSource {
            name: name.into(),
            registry,
            fetch,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl<F> DataSource for TranslatingSource<F>
where
    F: FnMut() -> Result<HashMap<String, Value>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_tables(&mut self) -> Result<TableState> {
        let payloads = (self.fetch)()?;
        Ok(self.registry.translate_all(&payloads))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Uninitialized,
    Initialized,
    Polling,
    Idle,
    Stopped,
}

/// What one call to [`Poller::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Fetch and publish completed.
    Completed,
    /// The fetch failed; the error was recorded and prior state kept.
    Failed,
    /// The poller was not in a pollable state; nothing ran.
    Deferred,
}

pub struct Poller<S, P> {
    source: S,
    publisher: P,
    engine: PublishEngine,
    current: TableState,
    prior: TableState,
    status: PollStatus,
    last_polled: Option<SystemTime>,
    last_error: Option<String>,
    update_count: u64,
}

impl<S: DataSource, P: Publisher> Poller<S, P> {
    /// Create a poller. All state containers exist once this returns, so
    /// the poller starts out `Initialized`.
    pub fn new(source: S, publisher: P) -> Self {
        Poller {
            source,
            publisher,
            engine: PublishEngine::new(),
            current: TableState::new(),
            prior: TableState::new(),
            status: PollStatus::Initialized,
            last_polled: None,
            last_error: None,
            update_count: 0,
        }
    }

    /// Create a poller whose ticks defer until [`Poller::initialize`] is
    /// called. For drivers that finish setting up their source after
    /// construction (late translator registration through
    /// [`Poller::source_mut`], say), so an early scheduler tick waits
    /// instead of polling a half-built source.
    pub fn new_uninitialized(source: S, publisher: P) -> Self {
        Poller {
            status: PollStatus::Uninitialized,
            ..Self::new(source, publisher)
        }
    }

    /// Mark construction complete; ticks run from here on. A no-op unless
    /// the poller is still `Uninitialized` — a stopped poller stays
    /// stopped.
    pub fn initialize(&mut self) {
        if self.status == PollStatus::Uninitialized {
            self.status = PollStatus::Initialized;
        }
    }

    /// Run one poll cycle. A tick that arrives while the poller is not
    /// pollable defers instead of crashing; a fetch error is recorded and
    /// the prior state stays authoritative.
    pub fn poll(&mut self) -> PollOutcome {
        match self.status {
            PollStatus::Initialized | PollStatus::Idle => {}
            _ => return PollOutcome::Deferred,
        }
        self.status = PollStatus::Polling;

        // Snapshot prior state once, at cycle start, never mid-cycle.
        self.prior = self.current.clone();
        self.last_error = None;

        let outcome = match self.source.poll_tables() {
            Ok(new_state) => {
                self.current = new_state;
                self.engine
                    .publish_cycle(&self.current, &self.prior, &mut self.publisher);
                self.last_polled = Some(SystemTime::now());
                self.update_count += 1;
                debug!(source = self.source.name(), "poll cycle completed");
                PollOutcome::Completed
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "poll cycle failed; keeping last good state"
                );
                self.last_error = Some(format!("{:#}", e));
                PollOutcome::Failed
            }
        };

        self.status = PollStatus::Idle;
        outcome
    }

    /// Stop the poller; subsequent ticks defer.
    pub fn stop(&mut self) {
        self.status = PollStatus::Stopped;
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    /// The current per-table state, i.e. the result of the last successful
    /// cycle.
    pub fn state(&self) -> &TableState {
        &self.current
    }

    pub fn last_polled(&self) -> Option<SystemTime> {
        self.last_polled
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

/// Handle to a background polling thread.
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl PollerHandle {
    /// Prevent future ticks and wait for the in-flight cycle, if any, to
    /// run to its natural end.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.thread.join();
    }
}

/// Spawn a thread that polls at the given fixed interval. A zero interval
/// disables self-triggering entirely and returns `None`; the caller can
/// still drive [`Poller::poll`] by hand.
pub fn spawn<S, P>(mut poller: Poller<S, P>, interval: Duration) -> Option<PollerHandle>
where
    S: DataSource + Send + 'static,
    P: Publisher + Send + 'static,
{
    if interval.is_zero() {
        return None;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let thread = std::thread::spawn(move || {
        while !flag.load(Ordering::Relaxed) {
            poller.poll();
            std::thread::sleep(interval);
        }
        poller.stop();
    });

    Some(PollerHandle { stop, thread })
}
