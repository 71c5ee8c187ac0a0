//! tabula-translate: translate nested JSON into relational rows
//!
//! Usage:
//!   # Translate one JSON document, rows to stdout
//!   tabula-translate spec.json data.json
//!
//!   # Read payloads from stdin
//!   echo '{"name": "vm1"}' | tabula-translate spec.json
//!
//!   # Process NDJSON, one JSONL file per table
//!   tabula-translate spec.json --ndjson payloads.jsonl --output-dir ./tables

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use tabula::translate::SingleWriter;
use tabula::{translate_stream, Registry, TableWriter};

#[derive(Parser, Debug)]
#[command(name = "tabula-translate")]
#[command(about = "Translate nested JSON into relational rows", long_about = None)]
struct Args {
    /// Translator spec file: one JSON spec object, or an array of them
    #[arg(value_name = "SPEC")]
    spec: String,

    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one payload per line)
    #[arg(long)]
    ndjson: bool,

    /// Root table whose translator receives the payloads
    /// (defaults to the first spec in the file)
    #[arg(long)]
    root: Option<String>,

    /// Output directory for separate .jsonl files per table
    /// If omitted, writes to stdout as a single tagged stream
    #[arg(long, short = 'o')]
    output_dir: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let registry = load_registry(&args.spec)?;
    let root = match &args.root {
        Some(root) => root.clone(),
        None => registry
            .specs()
            .first()
            .and_then(|s| s.table_name())
            .map(str::to_string)
            .context("spec file declares no root table")?,
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).context(format!("Failed to open input: {}", path))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    if let Some(output_dir) = &args.output_dir {
        let mut writer = TableWriter::new(output_dir, registry.schema().clone())?;
        if args.ndjson {
            translate_stream(reader, &registry, &root, &mut writer)?;
        } else {
            let rows = translate_single(reader, &registry, &root)?;
            writer.write_rows(&rows)?;
            writer.flush()?;
        }
    } else {
        let mut writer = SingleWriter::new(std::io::stdout().lock(), registry.schema().clone());
        if args.ndjson {
            for line in reader.lines() {
                let line = line.context("Failed to read line")?;
                if line.trim().is_empty() {
                    continue;
                }
                let value: Value =
                    serde_json::from_str(&line).context("Failed to parse JSON")?;
                if let Some(rows) = registry.translate(&root, &value) {
                    writer.write_rows(&rows)?;
                }
            }
        } else {
            let rows = translate_single(reader, &registry, &root)?;
            writer.write_rows(&rows)?;
        }
        writer.flush()?;
    }

    Ok(())
}

/// Load and register every spec in the file; registration is fail-fast on
/// schema errors.
fn load_registry(path: &str) -> Result<Registry> {
    let text =
        std::fs::read_to_string(path).context(format!("Failed to read spec file: {}", path))?;
    let value: Value = serde_json::from_str(&text).context("Failed to parse spec file")?;

    let mut registry = Registry::new();
    match &value {
        Value::Array(specs) => {
            for spec in specs {
                registry.register_json(spec)?;
            }
        }
        other => registry.register_json(other)?,
    }
    Ok(registry)
}

fn translate_single<R: Read>(
    mut reader: R,
    registry: &Registry,
    root: &str,
) -> Result<Vec<(String, tabula::Row)>> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("Failed to read input")?;
    let value: Value = serde_json::from_str(&text).context("Failed to parse JSON")?;

    registry
        .translate(root, &value)
        .context(format!("no translator registered for root table `{}`", root))
}
