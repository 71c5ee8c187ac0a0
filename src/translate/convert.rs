//! Recursive object-to-row conversion.
//!
//! Walks a source value guided by a translator spec and produces the flat
//! `(table, row)` pairs it implies, plus an optional content-hash identity
//! for the node itself. Conversion never fails on data: missing fields
//! normalize to the `None` sentinel, and absent composites simply produce
//! no rows. Structural problems are the validator's job, before any data
//! flows.

use crate::translate::hash::{hash_rows, hash_values};
use crate::translate::spec::{
    HDictSpec, ListSpec, RowKey, TranslatorSpec, VDictSpec, ValueSpec,
};
use crate::types::{DataValue, Row};
use serde_json::Value;
use std::collections::HashMap;

/// The result of converting one node: every row emitted by the node and its
/// descendants, and the node's own identity when its spec declares `id-col`.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub rows: Vec<(String, Row)>,
    pub identity: Option<u64>,
}

/// Column values of the enclosing row, made available to children that
/// declare `parent-key`.
pub type ParentContext = HashMap<String, DataValue>;

/// Convert a source value with the given translator spec.
pub fn convert(value: &Value, spec: &TranslatorSpec) -> Conversion {
    convert_node(Some(value), spec, &ParentContext::new())
}

fn convert_node(
    value: Option<&Value>,
    spec: &TranslatorSpec,
    parent: &ParentContext,
) -> Conversion {
    // Null and absent propagate identically.
    let value = value.filter(|v| !v.is_null());

    match spec {
        TranslatorSpec::HDict(h) => convert_hdict(value, h, parent),
        TranslatorSpec::VDict(v) => convert_vdict(value, v, parent),
        TranslatorSpec::List(l) => convert_list(value, l, parent),
        // A VALUE at the top level has no enclosing row to fold into.
        TranslatorSpec::Value(_) => Conversion { rows: Vec::new(), identity: None },
    }
}

/// Normalize a leaf value, applying the extraction hook when present.
fn leaf(value: Option<&Value>, spec: &ValueSpec) -> DataValue {
    match value {
        Some(v) => match spec.extract {
            Some(extract) => DataValue::normalize(&extract(v)),
            None => DataValue::normalize(v),
        },
        None => DataValue::None,
    }
}

/// Empty result for an absent composite. A node that requires `id-col`
/// still gets an identity, the hash of the empty collection, so its parent
/// can form a valid row.
fn absent(key: Option<&RowKey>) -> Conversion {
    let identity = match key {
        Some(RowKey::IdCol(_)) => Some(hash_values(&[])),
        _ => None,
    };
    Conversion { rows: Vec::new(), identity }
}

/// Resolve the key prefix for a row: the computed identity under `id-col`,
/// the inherited parent value under `parent-key`, nothing otherwise. Returns
/// the prefix value and the identity to report upward.
fn key_prefix(
    key: Option<&RowKey>,
    identity_of_content: impl FnOnce() -> u64,
    parent: &ParentContext,
) -> (Option<DataValue>, Option<u64>) {
    match key {
        Some(RowKey::IdCol(_)) => {
            let id = identity_of_content();
            (Some(DataValue::Id(id)), Some(id))
        }
        Some(RowKey::ParentKey(col)) => {
            let inherited = parent.get(col.as_str()).cloned().unwrap_or(DataValue::None);
            (Some(inherited), None)
        }
        None => (None, None),
    }
}

fn convert_hdict(value: Option<&Value>, spec: &HDictSpec, parent: &ParentContext) -> Conversion {
    let Some(obj) = value else {
        return absent(spec.key.as_ref());
    };

    let mut rows: Vec<(String, Row)> = Vec::new();
    let mut row_ctx = ParentContext::new();

    // Pass 1: fields whose children do not read back into this row. Their
    // values land in the row context, in declared order.
    for field in spec.fields.iter().filter(|f| !f.translator.has_parent_key()) {
        let raw = spec.selector.read(obj, &field.field);
        let folded = match &field.translator {
            TranslatorSpec::Value(vs) => leaf(raw, vs),
            composite => {
                let child = convert_node(raw, composite, &ParentContext::new());
                rows.extend(child.rows);
                match child.identity {
                    Some(id) => DataValue::Id(id),
                    None => DataValue::None,
                }
            }
        };
        row_ctx.insert(field.column_name().to_string(), folded);
    }

    // The row is the ordered values of the non-parent-key fields, prefixed
    // by the node's key column when it has one.
    let mut row: Row = spec
        .fields
        .iter()
        .filter(|f| !f.translator.has_parent_key())
        .map(|f| row_ctx[f.column_name()].clone())
        .collect();

    let (prefix, identity) = key_prefix(spec.key.as_ref(), || hash_values(&row), parent);
    if let (Some(prefix), Some(key)) = (prefix, spec.key.as_ref()) {
        row_ctx.insert(key.column().to_string(), prefix.clone());
        row.insert(0, prefix);
    }

    // Pass 2: children declaring `parent-key` resolve against the completed
    // row context, key column included. They contribute no column here;
    // their rows land in their own tables.
    for field in spec.fields.iter().filter(|f| f.translator.has_parent_key()) {
        let raw = spec.selector.read(obj, &field.field);
        let child = convert_node(raw, &field.translator, &row_ctx);
        rows.extend(child.rows);
    }

    rows.push((spec.table.clone(), row));
    Conversion { rows, identity }
}

fn convert_vdict(value: Option<&Value>, spec: &VDictSpec, parent: &ParentContext) -> Conversion {
    let Some(Value::Object(map)) = value else {
        return absent(spec.key.as_ref());
    };

    match &*spec.value {
        TranslatorSpec::Value(vs) => {
            // One row per entry. Under `id-col` every row shares the hash of
            // the whole key/value collection.
            let entries: Vec<Row> = map
                .iter()
                .map(|(k, v)| vec![DataValue::Str(k.clone()), leaf(Some(v), vs)])
                .collect();
            let (prefix, identity) = key_prefix(spec.key.as_ref(), || hash_rows(&entries), parent);

            let rows = entries
                .into_iter()
                .map(|mut entry| {
                    if let Some(prefix) = &prefix {
                        entry.insert(0, prefix.clone());
                    }
                    (spec.table.clone(), entry)
                })
                .collect();
            Conversion { rows, identity }
        }
        composite => {
            // Recurse per entry, threading the key so a `parent-key` child
            // can retrieve it; this table gets one (key, child-id) row per
            // entry.
            let mut rows: Vec<(String, Row)> = Vec::new();
            let mut entries: Vec<Row> = Vec::new();
            for (k, v) in map.iter() {
                let mut ctx = ParentContext::new();
                ctx.insert(spec.key_col.clone(), DataValue::Str(k.clone()));
                let child = convert_node(Some(v), composite, &ctx);
                rows.extend(child.rows);

                let child_val = match child.identity {
                    Some(id) => DataValue::Id(id),
                    None => DataValue::None,
                };
                entries.push(vec![DataValue::Str(k.clone()), child_val]);
            }

            let (prefix, identity) = key_prefix(spec.key.as_ref(), || hash_rows(&entries), parent);
            for mut entry in entries {
                if let Some(prefix) = &prefix {
                    entry.insert(0, prefix.clone());
                }
                rows.push((spec.table.clone(), entry));
            }
            Conversion { rows, identity }
        }
    }
}

fn convert_list(value: Option<&Value>, spec: &ListSpec, parent: &ParentContext) -> Conversion {
    let Some(Value::Array(items)) = value else {
        return absent(spec.key.as_ref());
    };

    match &*spec.element {
        TranslatorSpec::Value(vs) => {
            let values: Vec<DataValue> = items.iter().map(|v| leaf(Some(v), vs)).collect();
            let (prefix, identity) = key_prefix(spec.key.as_ref(), || hash_values(&values), parent);

            let rows = values
                .into_iter()
                .map(|v| {
                    let mut row = Vec::with_capacity(2);
                    if let Some(prefix) = &prefix {
                        row.push(prefix.clone());
                    }
                    row.push(v);
                    (spec.table.clone(), row)
                })
                .collect();
            Conversion { rows, identity }
        }
        composite => {
            // Validation guarantees composite elements declare `id-col`, so
            // every element contributes a join key; an element that somehow
            // lacks one falls back to the empty-collection hash.
            let mut rows: Vec<(String, Row)> = Vec::new();
            let mut values: Vec<DataValue> = Vec::new();
            for item in items {
                let child = convert_node(Some(item), composite, parent);
                rows.extend(child.rows);
                values.push(DataValue::Id(child.identity.unwrap_or_else(|| hash_values(&[]))));
            }

            let (prefix, identity) = key_prefix(spec.key.as_ref(), || hash_values(&values), parent);
            for v in values {
                let mut row = Vec::with_capacity(2);
                if let Some(prefix) = &prefix {
                    row.push(prefix.clone());
                }
                row.push(v);
                rows.push((spec.table.clone(), row));
            }
            Conversion { rows, identity }
        }
    }
}
