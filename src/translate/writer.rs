use crate::types::Row;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Render one row as a JSON object using the table's derived column names,
/// falling back to a bare value array when no schema entry exists or the
/// arity does not match. Scalars render through [`DataValue`]'s `Serialize`
/// impl, which cannot fail on scalar input.
pub fn row_to_json(row: &Row, columns: Option<&Vec<String>>) -> Value {
    let scalar = |v: &crate::types::DataValue| {
        serde_json::to_value(v).unwrap_or(Value::Null)
    };
    match columns {
        Some(cols) if cols.len() == row.len() => {
            let mut obj = Map::new();
            for (col, value) in cols.iter().zip(row) {
                obj.insert(col.clone(), scalar(value));
            }
            Value::Object(obj)
        }
        _ => Value::Array(row.iter().map(scalar).collect()),
    }
}

/// Writes translated rows to JSON Lines files, one file per table.
pub struct TableWriter {
    dir: PathBuf,
    schema: HashMap<String, Vec<String>>,
    files: HashMap<String, std::fs::File>,
}

impl TableWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P, schema: HashMap<String, Vec<String>>) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create output directory")?;

        Ok(TableWriter {
            dir: output_dir.as_ref().to_path_buf(),
            schema,
            files: HashMap::new(),
        })
    }

    pub fn write_rows(&mut self, rows: &[(String, Row)]) -> Result<()> {
        for (table, row) in rows {
            if !self.files.contains_key(table) {
                let path = self.dir.join(format!("{}.jsonl", table));
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .context(format!("Failed to open file: {}", path.display()))?;
                self.files.insert(table.clone(), file);
            }

            let json = row_to_json(row, self.schema.get(table));
            let file = self
                .files
                .get_mut(table)
                .context("writer for table vanished")?;
            writeln!(file, "{}", json).context("Failed to write row")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for file in self.files.values_mut() {
            file.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }
}

/// Writes all rows to one output stream, each line tagged with its table.
pub struct SingleWriter<W: Write> {
    writer: W,
    schema: HashMap<String, Vec<String>>,
}

impl<W: Write> SingleWriter<W> {
    pub fn new(writer: W, schema: HashMap<String, Vec<String>>) -> Self {
        SingleWriter { writer, schema }
    }

    pub fn write_rows(&mut self, rows: &[(String, Row)]) -> Result<()> {
        for (table, row) in rows {
            let mut obj = Map::new();
            obj.insert("_table".to_string(), Value::String(table.clone()));
            obj.insert("row".to_string(), row_to_json(row, self.schema.get(table)));
            writeln!(self.writer, "{}", Value::Object(obj)).context("Failed to write row")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataValue;

    #[test]
    fn test_row_to_json_uses_columns() {
        let row = vec![DataValue::from("a"), DataValue::Int(1)];
        let cols = vec!["key".to_string(), "value".to_string()];
        let json = row_to_json(&row, Some(&cols));
        assert_eq!(json["key"], "a");
        assert_eq!(json["value"], 1);
    }

    #[test]
    fn test_row_to_json_without_schema_is_array() {
        let row = vec![DataValue::Int(1), DataValue::None];
        let json = row_to_json(&row, None);
        assert_eq!(json, serde_json::json!([1, null]));
    }

    #[test]
    fn test_row_to_json_renders_identity_as_hex() {
        let row = vec![DataValue::Id(0xabc), DataValue::from("x")];
        let json = row_to_json(&row, None);
        assert_eq!(json, serde_json::json!(["0000000000000abc", "x"]));
    }

    #[test]
    fn test_single_writer_tags_table() {
        let mut buffer = Vec::new();
        let mut writer = SingleWriter::new(&mut buffer, HashMap::new());

        writer
            .write_rows(&[("meta".to_string(), vec![DataValue::from("x")])])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("\"_table\":\"meta\""));
    }
}
