//! Data-free schema derivation.
//!
//! Walks translator specs without touching data to produce the
//! `table -> ordered column names` mapping used for introspection and row
//! output. Duplicate table names are rejected here independently of full
//! validation, since schema derivation can be invoked on its own.

use crate::translate::spec::{SpecError, TranslatorSpec};
use std::collections::HashMap;

/// Derive the table schema implied by a set of top-level translator specs.
pub fn derive_schema(
    specs: &[TranslatorSpec],
) -> Result<HashMap<String, Vec<String>>, SpecError> {
    let mut schema = HashMap::new();
    for spec in specs {
        walk(spec, &mut schema)?;
    }
    Ok(schema)
}

/// Column name to tuple position for one table's derived columns.
pub fn column_index(columns: &[String]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), i))
        .collect()
}

fn walk(
    spec: &TranslatorSpec,
    schema: &mut HashMap<String, Vec<String>>,
) -> Result<(), SpecError> {
    match spec {
        TranslatorSpec::HDict(h) => {
            let mut columns = Vec::new();
            if let Some(key) = &h.key {
                columns.push(key.column().to_string());
            }
            for field in &h.fields {
                // A parent-key field is pulled out into its own subtable;
                // it contributes no column here.
                if !field.translator.has_parent_key() {
                    columns.push(field.column_name().to_string());
                }
                walk(&field.translator, schema)?;
            }
            reserve(schema, &h.table, columns)
        }
        TranslatorSpec::VDict(v) => {
            let mut columns = Vec::new();
            if let Some(key) = &v.key {
                columns.push(key.column().to_string());
            }
            columns.push(v.key_col.clone());
            columns.push(v.val_col.clone());
            walk(&v.value, schema)?;
            reserve(schema, &v.table, columns)
        }
        TranslatorSpec::List(l) => {
            let mut columns = Vec::new();
            if let Some(key) = &l.key {
                columns.push(key.column().to_string());
            }
            columns.push(l.val_col.clone());
            walk(&l.element, schema)?;
            reserve(schema, &l.table, columns)
        }
        TranslatorSpec::Value(_) => Ok(()),
    }
}

fn reserve(
    schema: &mut HashMap<String, Vec<String>>,
    table: &str,
    columns: Vec<String>,
) -> Result<(), SpecError> {
    if schema.contains_key(table) {
        return Err(SpecError::DuplicateTableName(table.to_string()));
    }
    schema.insert(table.to_string(), columns);
    Ok(())
}
