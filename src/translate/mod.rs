//! Object-to-relational translation.
//!
//! This module turns nested source values into flat relational rows, guided
//! by declarative translator specs. Specs are validated eagerly at
//! registration; conversion itself never fails on data.

pub mod convert;
pub mod hash;
pub mod parse;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod writer;

pub use convert::{convert, Conversion, ParentContext};
pub use hash::{hash_rows, hash_values};
pub use parse::spec_from_json;
pub use registry::Registry;
pub use schema::{column_index, derive_schema};
pub use spec::{
    FieldSpec, HDictSpec, ListSpec, RowKey, Selector, SpecError, TranslatorSpec, VDictSpec,
    ValueSpec,
};
pub use writer::{row_to_json, SingleWriter, TableWriter};
