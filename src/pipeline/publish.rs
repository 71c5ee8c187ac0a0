//! Delta publication to a downstream subscriber.
//!
//! The engine distinguishes, at the transport layer, a table the subscriber
//! has never seen (full snapshot) from an already-announced table
//! (incremental delta). Deltas with no changed rows are suppressed; both a
//! suppressed delta and an explicit empty snapshot are idempotent no-ops for
//! a well-behaved subscriber.

use crate::pipeline::delta::{compute_delta, tables_in_either};
use crate::types::{Row, TableState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// One publication for one table. Serializable so transports that ship
/// events over a bus or RPC boundary can encode them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableEvent {
    /// Full current content; sent the first time a table is published.
    Snapshot(Vec<Row>),
    /// Incremental change against the subscriber's last-known content.
    Delta {
        added: HashSet<Row>,
        removed: HashSet<Row>,
    },
}

/// Downstream event sink, typically the policy engine. Transport is the
/// implementor's business; the engine only guarantees correct deltas.
pub trait Publisher {
    fn publish(&mut self, table: &str, event: TableEvent);
}

/// Tracks which tables the subscriber has already seen and emits one event
/// per changed table each cycle.
#[derive(Debug, Default)]
pub struct PublishEngine {
    announced: HashSet<String>,
}

impl PublishEngine {
    pub fn new() -> Self {
        PublishEngine::default()
    }

    /// Publish the differences between two state snapshots. Every table in
    /// either snapshot is visited, so vanished tables still retract their
    /// rows.
    pub fn publish_cycle(
        &mut self,
        new: &TableState,
        old: &TableState,
        sink: &mut dyn Publisher,
    ) {
        for table in tables_in_either(new, old) {
            if !self.announced.contains(table) {
                let mut rows: Vec<Row> = new
                    .get(table)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();
                rows.sort();
                debug!(table, rows = rows.len(), "publishing initial snapshot");
                sink.publish(table, TableEvent::Snapshot(rows));
                self.announced.insert(table.to_string());
                continue;
            }

            let delta = compute_delta(new, old, table);
            if delta.is_empty() {
                continue;
            }
            debug!(
                table,
                added = delta.added.len(),
                removed = delta.removed.len(),
                "publishing delta"
            );
            sink.publish(
                table,
                TableEvent::Delta {
                    added: delta.added,
                    removed: delta.removed,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataValue;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(String, TableEvent)>,
    }

    impl Publisher for Recorder {
        fn publish(&mut self, table: &str, event: TableEvent) {
            self.events.push((table.to_string(), event));
        }
    }

    fn state(table: &str, rows: &[Vec<i64>]) -> TableState {
        HashMap::from([(
            table.to_string(),
            rows.iter()
                .map(|r| r.iter().map(|&v| DataValue::Int(v)).collect())
                .collect(),
        )])
    }

    #[test]
    fn test_first_sight_is_snapshot() {
        let mut engine = PublishEngine::new();
        let mut sink = Recorder::default();

        let new = state("t", &[vec![1], vec![2]]);
        engine.publish_cycle(&new, &TableState::new(), &mut sink);

        assert_eq!(sink.events.len(), 1);
        let (table, event) = &sink.events[0];
        assert_eq!(table, "t");
        let TableEvent::Snapshot(rows) = event else {
            panic!("expected snapshot");
        };
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_second_cycle_is_delta() {
        let mut engine = PublishEngine::new();
        let mut sink = Recorder::default();

        let first = state("t", &[vec![1]]);
        engine.publish_cycle(&first, &TableState::new(), &mut sink);

        let second = state("t", &[vec![2]]);
        engine.publish_cycle(&second, &first, &mut sink);

        assert_eq!(sink.events.len(), 2);
        let TableEvent::Delta { added, removed } = &sink.events[1].1 else {
            panic!("expected delta");
        };
        assert_eq!(added.len(), 1);
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn test_unchanged_table_is_suppressed() {
        let mut engine = PublishEngine::new();
        let mut sink = Recorder::default();

        let snapshot = state("t", &[vec![1]]);
        engine.publish_cycle(&snapshot, &TableState::new(), &mut sink);
        engine.publish_cycle(&snapshot, &snapshot, &mut sink);

        assert_eq!(sink.events.len(), 1);
    }

    #[test]
    fn test_vanished_table_retracts_rows() {
        let mut engine = PublishEngine::new();
        let mut sink = Recorder::default();

        let first = state("t", &[vec![1]]);
        engine.publish_cycle(&first, &TableState::new(), &mut sink);
        engine.publish_cycle(&TableState::new(), &first, &mut sink);

        let TableEvent::Delta { added, removed } = &sink.events[1].1 else {
            panic!("expected delta");
        };
        assert!(added.is_empty());
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn test_event_survives_json_round_trip() {
        let event = TableEvent::Delta {
            added: HashSet::from([vec![DataValue::Int(1), DataValue::from("x")]]),
            removed: HashSet::new(),
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: TableEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_empty_table_still_announced() {
        let mut engine = PublishEngine::new();
        let mut sink = Recorder::default();

        let new = state("t", &[]);
        engine.publish_cycle(&new, &TableState::new(), &mut sink);

        assert_eq!(
            sink.events[0],
            ("t".to_string(), TableEvent::Snapshot(Vec::new()))
        );
    }
}
