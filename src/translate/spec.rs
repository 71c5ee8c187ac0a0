//! Declarative translator specs.
//!
//! A translator spec describes how one nested source shape maps onto one or
//! more relational tables. Specs form a closed sum type with one variant per
//! node kind (HDICT, VDICT, LIST, VALUE), each carrying only its legal
//! fields, so most structural mistakes are unrepresentable when specs are
//! built in code. Specs arriving as JSON go through [`crate::translate::parse`],
//! which enforces the per-kind parameter allow-lists at the boundary.

use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Schema-time validation errors. These surface at registration and prevent
/// the driver from becoming usable; they are never raised during conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("unknown translation type `{0}`")]
    InvalidTranslationType(String),

    #[error("invalid parameter `{param}` for {kind} translator")]
    InvalidParam { kind: &'static str, param: String },

    #[error("missing required parameter `{param}` for {kind} translator")]
    MissingParam { kind: &'static str, param: String },

    #[error("table `{0}` is declared more than once")]
    DuplicateTableName(String),

    #[error("`id-col` and `parent-key` are mutually exclusive on table `{0}`")]
    ExclusiveKeys(String),

    #[error("LIST table `{0}` requires `id-col` on its composite element translator")]
    MissingElementId(String),
}

/// How an HDICT reads fields from its source object.
///
/// `Dict` is plain key access. `Dot` models attribute access on objects the
/// driver serialized from SDK structs; over JSON input it resolves to the
/// same key lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Dot,
    Dict,
}

impl Selector {
    pub(crate) fn read<'a>(&self, obj: &'a Value, field: &str) -> Option<&'a Value> {
        match self {
            Selector::Dict | Selector::Dot => obj.get(field),
        }
    }
}

/// The key column of a non-VALUE node: either a synthesized content-hash
/// identity, or a value inherited from the enclosing row. The two are
/// mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    IdCol(String),
    ParentKey(String),
}

impl RowKey {
    pub fn column(&self) -> &str {
        match self {
            RowKey::IdCol(c) | RowKey::ParentKey(c) => c,
        }
    }
}

/// Optional extraction hook on VALUE leaves, applied to the raw source value
/// before normalization. Defaults to identity.
pub type ExtractFn = fn(&Value) -> Value;

#[derive(Debug, Clone, PartialEq)]
pub enum TranslatorSpec {
    HDict(HDictSpec),
    VDict(VDictSpec),
    List(ListSpec),
    Value(ValueSpec),
}

/// Heterogeneous object: one row per source object, one column per field.
#[derive(Debug, Clone, PartialEq)]
pub struct HDictSpec {
    pub table: String,
    pub selector: Selector,
    pub key: Option<RowKey>,
    pub fields: Vec<FieldSpec>,
}

/// Key/value map: one row per entry.
#[derive(Debug, Clone, PartialEq)]
pub struct VDictSpec {
    pub table: String,
    pub key_col: String,
    pub val_col: String,
    pub key: Option<RowKey>,
    pub value: Box<TranslatorSpec>,
}

/// Sequence: one row per element.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSpec {
    pub table: String,
    pub val_col: String,
    pub key: Option<RowKey>,
    pub element: Box<TranslatorSpec>,
}

/// Scalar leaf. Emits no rows of its own; its normalized value folds into
/// the enclosing row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSpec {
    pub extract: Option<ExtractFn>,
}

/// One HDICT field: the source field name, the output column (defaults to
/// the field name), and the child translator for the field's value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field: String,
    pub col: Option<String>,
    pub translator: TranslatorSpec,
}

impl FieldSpec {
    pub fn column_name(&self) -> &str {
        self.col.as_deref().unwrap_or(&self.field)
    }
}

impl HDictSpec {
    pub fn new(table: impl Into<String>) -> Self {
        HDictSpec {
            table: table.into(),
            selector: Selector::Dict,
            key: None,
            fields: Vec::new(),
        }
    }

    pub fn selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn id_col(mut self, col: impl Into<String>) -> Self {
        self.key = Some(RowKey::IdCol(col.into()));
        self
    }

    pub fn parent_key(mut self, col: impl Into<String>) -> Self {
        self.key = Some(RowKey::ParentKey(col.into()));
        self
    }

    pub fn field(self, name: impl Into<String>, translator: TranslatorSpec) -> Self {
        self.field_as(name, None::<String>, translator)
    }

    pub fn field_as(
        mut self,
        name: impl Into<String>,
        col: Option<impl Into<String>>,
        translator: TranslatorSpec,
    ) -> Self {
        self.fields.push(FieldSpec {
            field: name.into(),
            col: col.map(Into::into),
            translator,
        });
        self
    }

    pub fn build(self) -> TranslatorSpec {
        TranslatorSpec::HDict(self)
    }
}

impl VDictSpec {
    pub fn new(
        table: impl Into<String>,
        key_col: impl Into<String>,
        val_col: impl Into<String>,
        value: TranslatorSpec,
    ) -> Self {
        VDictSpec {
            table: table.into(),
            key_col: key_col.into(),
            val_col: val_col.into(),
            key: None,
            value: Box::new(value),
        }
    }

    pub fn id_col(mut self, col: impl Into<String>) -> Self {
        self.key = Some(RowKey::IdCol(col.into()));
        self
    }

    pub fn parent_key(mut self, col: impl Into<String>) -> Self {
        self.key = Some(RowKey::ParentKey(col.into()));
        self
    }

    pub fn build(self) -> TranslatorSpec {
        TranslatorSpec::VDict(self)
    }
}

impl ListSpec {
    pub fn new(
        table: impl Into<String>,
        val_col: impl Into<String>,
        element: TranslatorSpec,
    ) -> Self {
        ListSpec {
            table: table.into(),
            val_col: val_col.into(),
            key: None,
            element: Box::new(element),
        }
    }

    pub fn id_col(mut self, col: impl Into<String>) -> Self {
        self.key = Some(RowKey::IdCol(col.into()));
        self
    }

    pub fn parent_key(mut self, col: impl Into<String>) -> Self {
        self.key = Some(RowKey::ParentKey(col.into()));
        self
    }

    pub fn build(self) -> TranslatorSpec {
        TranslatorSpec::List(self)
    }
}

impl TranslatorSpec {
    /// A plain identity VALUE leaf.
    pub fn value() -> TranslatorSpec {
        TranslatorSpec::Value(ValueSpec::default())
    }

    /// A VALUE leaf with an extraction hook applied before normalization.
    pub fn value_with(extract: ExtractFn) -> TranslatorSpec {
        TranslatorSpec::Value(ValueSpec { extract: Some(extract) })
    }

    /// The table this node emits rows into, if it is not a VALUE leaf.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            TranslatorSpec::HDict(h) => Some(&h.table),
            TranslatorSpec::VDict(v) => Some(&v.table),
            TranslatorSpec::List(l) => Some(&l.table),
            TranslatorSpec::Value(_) => None,
        }
    }

    pub fn key(&self) -> Option<&RowKey> {
        match self {
            TranslatorSpec::HDict(h) => h.key.as_ref(),
            TranslatorSpec::VDict(v) => v.key.as_ref(),
            TranslatorSpec::List(l) => l.key.as_ref(),
            TranslatorSpec::Value(_) => None,
        }
    }

    pub fn has_id_col(&self) -> bool {
        matches!(self.key(), Some(RowKey::IdCol(_)))
    }

    pub fn has_parent_key(&self) -> bool {
        matches!(self.key(), Some(RowKey::ParentKey(_)))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, TranslatorSpec::Value(_))
    }

    /// Validate the tree rooted at this node. Children are validated before
    /// the node itself so errors surface at the deepest point of failure.
    /// `seen` accumulates table names across every registered translator;
    /// a second occurrence of a name anywhere in the reachable tree fails
    /// with [`SpecError::DuplicateTableName`].
    pub fn validate(&self, seen: &mut HashSet<String>) -> Result<(), SpecError> {
        match self {
            TranslatorSpec::HDict(h) => {
                for field in &h.fields {
                    if field.field.is_empty() {
                        return Err(SpecError::MissingParam {
                            kind: "HDICT",
                            param: "fieldname".to_string(),
                        });
                    }
                    field.translator.validate(seen)?;
                }
                Self::reserve_table(&h.table, seen)
            }
            TranslatorSpec::VDict(v) => {
                v.value.validate(seen)?;
                Self::reserve_table(&v.table, seen)
            }
            TranslatorSpec::List(l) => {
                l.element.validate(seen)?;
                // A composite element needs a join key back to its container.
                if !l.element.is_value() && !l.element.has_id_col() {
                    return Err(SpecError::MissingElementId(l.table.clone()));
                }
                Self::reserve_table(&l.table, seen)
            }
            TranslatorSpec::Value(_) => Ok(()),
        }
    }

    fn reserve_table(table: &str, seen: &mut HashSet<String>) -> Result<(), SpecError> {
        if !seen.insert(table.to_string()) {
            return Err(SpecError::DuplicateTableName(table.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_hdict_validates() {
        let spec = HDictSpec::new("servers")
            .field("id", TranslatorSpec::value())
            .field("name", TranslatorSpec::value())
            .build();

        let mut seen = HashSet::new();
        assert!(spec.validate(&mut seen).is_ok());
        assert!(seen.contains("servers"));
    }

    #[test]
    fn test_duplicate_table_name_rejected() {
        let spec = HDictSpec::new("servers")
            .field(
                "addresses",
                ListSpec::new("servers", "address", TranslatorSpec::value())
                    .parent_key("id")
                    .build(),
            )
            .build();

        let mut seen = HashSet::new();
        assert_eq!(
            spec.validate(&mut seen),
            Err(SpecError::DuplicateTableName("servers".to_string()))
        );
    }

    #[test]
    fn test_duplicate_across_registrations() {
        let first = HDictSpec::new("flavors").build();
        let second = HDictSpec::new("flavors").build();

        let mut seen = HashSet::new();
        first.validate(&mut seen).unwrap();
        assert_eq!(
            second.validate(&mut seen),
            Err(SpecError::DuplicateTableName("flavors".to_string()))
        );
    }

    #[test]
    fn test_list_composite_element_requires_id() {
        let element = HDictSpec::new("members")
            .field("name", TranslatorSpec::value())
            .build();
        let spec = ListSpec::new("groups", "member", element).build();

        let mut seen = HashSet::new();
        assert_eq!(
            spec.validate(&mut seen),
            Err(SpecError::MissingElementId("groups".to_string()))
        );
    }

    #[test]
    fn test_field_column_defaults_to_fieldname() {
        let field = FieldSpec {
            field: "status".to_string(),
            col: None,
            translator: TranslatorSpec::value(),
        };
        assert_eq!(field.column_name(), "status");
    }

    #[test]
    fn test_key_setters_overwrite() {
        // Programmatic specs cannot hold both keys at once; the last setter
        // wins.
        let spec = HDictSpec::new("t").id_col("id").parent_key("pk").build();
        assert!(spec.has_parent_key());
        assert!(!spec.has_id_col());
    }
}
