//! Stateful delta publishing.
//!
//! This module owns the prior/current state snapshots for a data source,
//! diffs them table by table, and drives the periodic fetch → translate →
//! diff → publish lifecycle.

pub mod delta;
pub mod poll;
pub mod publish;

pub use delta::{compute_delta, tables_in_either, TableDelta};
pub use poll::{
    spawn, DataSource, PollOutcome, PollStatus, Poller, PollerHandle, TranslatingSource,
};
pub use publish::{PublishEngine, Publisher, TableEvent};
