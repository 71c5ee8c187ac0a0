//! Per-table state diffing.

use crate::types::{Row, TableState};
use std::collections::{BTreeSet, HashSet};

/// Rows added and removed between two snapshots of one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableDelta {
    pub added: HashSet<Row>,
    pub removed: HashSet<Row>,
}

impl TableDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute `added = new - old` and `removed = old - new` for one table.
/// A table absent from either snapshot counts as empty on that side.
pub fn compute_delta(new: &TableState, old: &TableState, table: &str) -> TableDelta {
    let empty = HashSet::new();
    let new_rows = new.get(table).unwrap_or(&empty);
    let old_rows = old.get(table).unwrap_or(&empty);

    TableDelta {
        added: new_rows.difference(old_rows).cloned().collect(),
        removed: old_rows.difference(new_rows).cloned().collect(),
    }
}

/// Every table present in either snapshot, in stable order. Tables that
/// disappeared from the new snapshot must still be visited so their rows
/// get retracted downstream.
pub fn tables_in_either<'a>(new: &'a TableState, old: &'a TableState) -> BTreeSet<&'a str> {
    new.keys().chain(old.keys()).map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataValue;
    use std::collections::HashMap;

    fn state(table: &str, rows: &[Row]) -> TableState {
        HashMap::from([(table.to_string(), rows.iter().cloned().collect())])
    }

    fn row(values: &[i64]) -> Row {
        values.iter().map(|&v| DataValue::Int(v)).collect()
    }

    #[test]
    fn test_added_and_removed() {
        let old = state("t", &[row(&[1, 2]), row(&[3, 4])]);
        let new = state("t", &[row(&[3, 4]), row(&[5, 6])]);

        let delta = compute_delta(&new, &old, "t");
        assert_eq!(delta.added, HashSet::from([row(&[5, 6])]));
        assert_eq!(delta.removed, HashSet::from([row(&[1, 2])]));
    }

    #[test]
    fn test_table_absent_from_new() {
        let old = state("T", &[row(&[1, 2])]);
        let new = TableState::new();

        let delta = compute_delta(&new, &old, "T");
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, HashSet::from([row(&[1, 2])]));
    }

    #[test]
    fn test_table_absent_from_both_is_noop() {
        let delta = compute_delta(&TableState::new(), &TableState::new(), "missing");
        assert!(delta.is_empty());
    }

    #[test]
    fn test_delta_reconstructs_new_state() {
        // (old - removed) ∪ added == new
        let old = state("t", &[row(&[1]), row(&[2]), row(&[3])]);
        let new = state("t", &[row(&[2]), row(&[4])]);

        let delta = compute_delta(&new, &old, "t");
        let mut reconstructed: HashSet<Row> = old["t"]
            .difference(&delta.removed)
            .cloned()
            .collect();
        reconstructed.extend(delta.added.iter().cloned());
        assert_eq!(reconstructed, new["t"]);
    }

    #[test]
    fn test_tables_in_either_visits_vanished() {
        let old = state("gone", &[row(&[1])]);
        let new = state("fresh", &[row(&[2])]);
        let tables = tables_in_either(&new, &old);
        assert!(tables.contains("gone"));
        assert!(tables.contains("fresh"));
    }
}
