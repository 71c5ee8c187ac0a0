//! tabula-schema: print the table schema a translator spec implies
//!
//! Usage:
//!   tabula-schema spec.json

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::collections::BTreeMap;
use tabula::translate::{derive_schema, spec_from_json};

#[derive(Parser, Debug)]
#[command(name = "tabula-schema")]
#[command(about = "Derive the relational schema from a translator spec", long_about = None)]
struct Args {
    /// Translator spec file: one JSON spec object, or an array of them
    #[arg(value_name = "SPEC")]
    spec: String,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.spec)
        .context(format!("Failed to read spec file: {}", args.spec))?;
    let value: Value = serde_json::from_str(&text).context("Failed to parse spec file")?;

    let mut specs = Vec::new();
    match &value {
        Value::Array(raw) => {
            for spec in raw {
                specs.push(spec_from_json(spec)?);
            }
        }
        other => specs.push(spec_from_json(other)?),
    }

    // Sort tables for stable output.
    let schema: BTreeMap<String, Vec<String>> = derive_schema(&specs)?.into_iter().collect();

    let output = if args.pretty {
        serde_json::to_string_pretty(&schema)?
    } else {
        serde_json::to_string(&schema)?
    };
    println!("{}", output);

    Ok(())
}
