//! Translator registration and introspection.
//!
//! A [`Registry`] owns the validated translator specs for one data source.
//! Registration is fail-fast: a spec that does not validate leaves the
//! registry untouched. Once registered, every declared table has a schema
//! entry and a slot in the state template, so conversion always starts with
//! every table present even when a poll produces no rows for it.

use crate::translate::convert::convert;
use crate::translate::parse::spec_from_json;
use crate::translate::schema::{column_index, derive_schema};
use crate::translate::spec::{SpecError, TranslatorSpec};
use crate::types::{Row, TableState};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct Registry {
    specs: Vec<TranslatorSpec>,
    tables: HashSet<String>,
    schema: HashMap<String, Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a translator spec. Table names must be unique across every
    /// spec registered so far; a failed registration reserves nothing.
    pub fn register(&mut self, spec: TranslatorSpec) -> Result<(), SpecError> {
        let mut seen = self.tables.clone();
        spec.validate(&mut seen)?;
        let added = derive_schema(std::slice::from_ref(&spec))?;

        self.schema.extend(added);
        self.tables = seen;
        self.specs.push(spec);
        Ok(())
    }

    /// Register a spec from its JSON representation.
    pub fn register_json(&mut self, value: &Value) -> Result<(), SpecError> {
        self.register(spec_from_json(value)?)
    }

    pub fn specs(&self) -> &[TranslatorSpec] {
        &self.specs
    }

    /// The derived `table -> ordered column names` mapping.
    pub fn schema(&self) -> &HashMap<String, Vec<String>> {
        &self.schema
    }

    /// Column name to tuple position for one table.
    pub fn get_column_index(&self, table: &str) -> Option<HashMap<String, usize>> {
        self.schema.get(table).map(|cols| column_index(cols))
    }

    /// A fresh state mapping with an empty row-set slot for every declared
    /// table.
    pub fn empty_state(&self) -> TableState {
        self.tables
            .iter()
            .map(|t| (t.clone(), HashSet::new()))
            .collect()
    }

    /// The spec whose root table carries the given name.
    pub fn spec_for(&self, root_table: &str) -> Option<&TranslatorSpec> {
        self.specs
            .iter()
            .find(|s| s.table_name() == Some(root_table))
    }

    /// Translate one payload with the spec rooted at `root_table`. Returns
    /// `None` when no such spec is registered.
    pub fn translate(&self, root_table: &str, value: &Value) -> Option<Vec<(String, Row)>> {
        self.spec_for(root_table).map(|spec| convert(value, spec).rows)
    }

    /// Translate one payload per registered spec into a full per-table
    /// state. Payloads are keyed by root table name; specs without a payload
    /// contribute empty tables.
    pub fn translate_all(&self, payloads: &HashMap<String, Value>) -> TableState {
        let mut state = self.empty_state();
        for spec in &self.specs {
            let Some(root) = spec.table_name() else { continue };
            let Some(payload) = payloads.get(root) else { continue };
            for (table, row) in convert(payload, spec).rows {
                state.entry(table).or_default().insert(row);
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::spec::{HDictSpec, ListSpec};
    use serde_json::json;

    fn server_spec() -> TranslatorSpec {
        HDictSpec::new("servers")
            .id_col("id")
            .field("name", TranslatorSpec::value())
            .field(
                "tags",
                ListSpec::new("tags", "tag", TranslatorSpec::value())
                    .parent_key("id")
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_register_reserves_all_tables() {
        let mut registry = Registry::new();
        registry.register(server_spec()).unwrap();

        let state = registry.empty_state();
        assert!(state.contains_key("servers"));
        assert!(state.contains_key("tags"));
        assert!(state["tags"].is_empty());
    }

    #[test]
    fn test_duplicate_registration_rejected_and_reserves_nothing() {
        let mut registry = Registry::new();
        registry.register(server_spec()).unwrap();

        let clash = HDictSpec::new("flavors")
            .field(
                "tags",
                ListSpec::new("tags", "tag", TranslatorSpec::value()).build(),
            )
            .build();
        assert_eq!(
            registry.register(clash),
            Err(SpecError::DuplicateTableName("tags".to_string()))
        );
        assert!(!registry.empty_state().contains_key("flavors"));
    }

    #[test]
    fn test_register_json_round_trip() {
        let mut registry = Registry::new();
        registry
            .register_json(&json!({
                "translation-type": "VDICT",
                "table-name": "meta",
                "key-col": "key",
                "val-col": "value",
                "translator": {"translation-type": "VALUE"}
            }))
            .unwrap();

        assert_eq!(registry.schema()["meta"], vec!["key", "value"]);
        let index = registry.get_column_index("meta").unwrap();
        assert_eq!(index["value"], 1);
    }

    #[test]
    fn test_translate_all_fills_missing_tables() {
        let mut registry = Registry::new();
        registry.register(server_spec()).unwrap();

        let payloads =
            HashMap::from([("servers".to_string(), json!({"name": "vm1", "tags": []}))]);
        let state = registry.translate_all(&payloads);

        assert_eq!(state["servers"].len(), 1);
        assert!(state["tags"].is_empty());
    }

    #[test]
    fn test_translate_unknown_root_is_none() {
        let registry = Registry::new();
        assert!(registry.translate("servers", &json!({})).is_none());
    }
}
