//! Parsing translator specs from JSON.
//!
//! Externally supplied specs arrive as JSON objects keyed by kebab-case
//! parameter names (`translation-type`, `table-name`, `field-translators`,
//! ...). Each node kind accepts a fixed allow-list of parameters; anything
//! else is rejected, as are unknown kinds, missing requireds, and a node
//! declaring both `id-col` and `parent-key`. Extraction hooks are
//! function-valued and therefore not expressible here; they exist only on
//! programmatically built specs.

use crate::translate::spec::{
    FieldSpec, HDictSpec, ListSpec, RowKey, Selector, SpecError, TranslatorSpec, VDictSpec,
    ValueSpec,
};
use serde_json::{Map, Value};

const HDICT_PARAMS: &[&str] = &[
    "translation-type",
    "table-name",
    "selector-type",
    "field-translators",
    "id-col",
    "parent-key",
];
const VDICT_PARAMS: &[&str] = &[
    "translation-type",
    "table-name",
    "key-col",
    "val-col",
    "id-col",
    "parent-key",
    "translator",
];
const LIST_PARAMS: &[&str] = &[
    "translation-type",
    "table-name",
    "val-col",
    "id-col",
    "parent-key",
    "translator",
];
const VALUE_PARAMS: &[&str] = &["translation-type"];
const FIELD_PARAMS: &[&str] = &["fieldname", "col", "translator"];

/// Parse a translator spec from its JSON representation.
pub fn spec_from_json(value: &Value) -> Result<TranslatorSpec, SpecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| SpecError::InvalidTranslationType(value.to_string()))?;

    let kind = obj
        .get("translation-type")
        .and_then(Value::as_str)
        .ok_or(SpecError::MissingParam {
            kind: "translator",
            param: "translation-type".to_string(),
        })?;

    match kind {
        "HDICT" => parse_hdict(obj),
        "VDICT" => parse_vdict(obj),
        "LIST" => parse_list(obj),
        "VALUE" => parse_value(obj),
        other => Err(SpecError::InvalidTranslationType(other.to_string())),
    }
}

fn parse_hdict(obj: &Map<String, Value>) -> Result<TranslatorSpec, SpecError> {
    check_params("HDICT", obj, HDICT_PARAMS)?;
    let table = required_str("HDICT", obj, "table-name")?;
    let selector = match obj.get("selector-type").and_then(Value::as_str) {
        None | Some("DICT_SELECTOR") => Selector::Dict,
        Some("DOT_SELECTOR") => Selector::Dot,
        Some(other) => {
            return Err(SpecError::InvalidParam {
                kind: "HDICT",
                param: format!("selector-type `{}`", other),
            })
        }
    };

    let mut fields = Vec::new();
    let entries = obj
        .get("field-translators")
        .and_then(Value::as_array)
        .ok_or(SpecError::MissingParam {
            kind: "HDICT",
            param: "field-translators".to_string(),
        })?;
    for entry in entries {
        fields.push(parse_field(entry)?);
    }

    Ok(TranslatorSpec::HDict(HDictSpec {
        table: table.to_string(),
        selector,
        key: parse_key("HDICT", obj, table)?,
        fields,
    }))
}

fn parse_field(value: &Value) -> Result<FieldSpec, SpecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| SpecError::InvalidParam {
            kind: "HDICT",
            param: "field-translators".to_string(),
        })?;
    check_params("HDICT field", obj, FIELD_PARAMS)?;

    let field = required_str("HDICT field", obj, "fieldname")?;
    let translator = obj.get("translator").ok_or(SpecError::MissingParam {
        kind: "HDICT field",
        param: "translator".to_string(),
    })?;

    Ok(FieldSpec {
        field: field.to_string(),
        col: obj.get("col").and_then(Value::as_str).map(str::to_string),
        translator: spec_from_json(translator)?,
    })
}

fn parse_vdict(obj: &Map<String, Value>) -> Result<TranslatorSpec, SpecError> {
    check_params("VDICT", obj, VDICT_PARAMS)?;
    let table = required_str("VDICT", obj, "table-name")?;
    let key_col = required_str("VDICT", obj, "key-col")?;
    let val_col = required_str("VDICT", obj, "val-col")?;
    let value = obj.get("translator").ok_or(SpecError::MissingParam {
        kind: "VDICT",
        param: "translator".to_string(),
    })?;

    Ok(TranslatorSpec::VDict(VDictSpec {
        table: table.to_string(),
        key_col: key_col.to_string(),
        val_col: val_col.to_string(),
        key: parse_key("VDICT", obj, table)?,
        value: Box::new(spec_from_json(value)?),
    }))
}

fn parse_list(obj: &Map<String, Value>) -> Result<TranslatorSpec, SpecError> {
    check_params("LIST", obj, LIST_PARAMS)?;
    let table = required_str("LIST", obj, "table-name")?;
    let val_col = required_str("LIST", obj, "val-col")?;
    let element = obj.get("translator").ok_or(SpecError::MissingParam {
        kind: "LIST",
        param: "translator".to_string(),
    })?;

    Ok(TranslatorSpec::List(ListSpec {
        table: table.to_string(),
        val_col: val_col.to_string(),
        key: parse_key("LIST", obj, table)?,
        element: Box::new(spec_from_json(element)?),
    }))
}

fn parse_value(obj: &Map<String, Value>) -> Result<TranslatorSpec, SpecError> {
    check_params("VALUE", obj, VALUE_PARAMS)?;
    Ok(TranslatorSpec::Value(ValueSpec::default()))
}

fn check_params(
    kind: &'static str,
    obj: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), SpecError> {
    for param in obj.keys() {
        if !allowed.contains(&param.as_str()) {
            return Err(SpecError::InvalidParam {
                kind,
                param: param.clone(),
            });
        }
    }
    Ok(())
}

fn required_str<'a>(
    kind: &'static str,
    obj: &'a Map<String, Value>,
    param: &str,
) -> Result<&'a str, SpecError> {
    obj.get(param)
        .and_then(Value::as_str)
        .ok_or(SpecError::MissingParam {
            kind,
            param: param.to_string(),
        })
}

fn parse_key(
    kind: &'static str,
    obj: &Map<String, Value>,
    table: &str,
) -> Result<Option<RowKey>, SpecError> {
    if obj.contains_key("id-col") && obj.contains_key("parent-key") {
        return Err(SpecError::ExclusiveKeys(table.to_string()));
    }
    for (param, ctor) in [
        ("id-col", RowKey::IdCol as fn(String) -> RowKey),
        ("parent-key", RowKey::ParentKey as fn(String) -> RowKey),
    ] {
        if let Some(raw) = obj.get(param) {
            let col = raw.as_str().ok_or(SpecError::InvalidParam {
                kind,
                param: param.to_string(),
            })?;
            return Ok(Some(ctor(col.to_string())));
        }
    }
    Ok(None)
}
