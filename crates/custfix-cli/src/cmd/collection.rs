use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use clap::Subcommand;
use custfix_core::config::Config;
use custfix_core::document::Document;
use custfix_core::store::DocumentStore;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum CollectionSubcommand {
    /// Load a JSON array of objects (each with an "id") into a collection
    Import {
        /// Collection name
        name: String,
        /// JSON file to read
        file: PathBuf,
    },

    /// List every document in a collection
    List {
        /// Collection name
        name: String,
    },

    /// Show one document
    Get {
        /// Collection name
        name: String,
        /// Document id
        id: String,
    },
}

pub fn run(root: &Path, subcmd: CollectionSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    match subcmd {
        CollectionSubcommand::Import { name, file } => import(root, &config, &name, &file, json),
        CollectionSubcommand::List { name } => list(root, &config, &name, json),
        CollectionSubcommand::Get { name, id } => get(root, &config, &name, &id, json),
    }
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

fn import(root: &Path, config: &Config, name: &str, file: &Path, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let value: Value = serde_json::from_str(&data)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let Value::Array(records) = value else {
        bail!("{} must contain a JSON array of objects", file.display());
    };

    // Parse everything before writing so a bad record imports nothing.
    let docs = records
        .into_iter()
        .enumerate()
        .map(|(i, v)| Document::from_json_object(v).with_context(|| format!("record {i}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let store = super::open_store(root, config)?;
    let collection = store.collection(name)?;
    for doc in &docs {
        collection
            .upsert(doc)
            .with_context(|| format!("failed to write {}/{}", name, doc.id))?;
    }

    if json {
        print_json(&serde_json::json!({ "collection": name, "imported": docs.len() }))?;
    } else {
        println!("Imported {} documents into {name}", docs.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, config: &Config, name: &str, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(root, config)?;
    let docs = store.collection(name)?.list()?;

    if json {
        let values: Vec<Value> = docs.iter().map(Document::to_json_object).collect();
        return print_json(&values);
    }

    if docs.is_empty() {
        println!("No documents in {name}.");
        return Ok(());
    }

    let rows = docs
        .iter()
        .map(|d| {
            vec![
                d.id.clone(),
                field_text(d, "customer_id"),
                field_text(d, "customer_name"),
                field_text(d, "name"),
                field_text(d, "company_name"),
            ]
        })
        .collect();
    print_table(
        &["ID", "CUSTOMER_ID", "CUSTOMER_NAME", "NAME", "COMPANY_NAME"],
        rows,
    );
    Ok(())
}

fn field_text(doc: &Document, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// get
// ---------------------------------------------------------------------------

fn get(root: &Path, config: &Config, name: &str, id: &str, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(root, config)?;
    let Some(doc) = store.collection(name)?.get(id)? else {
        bail!("document not found: {name}/{id}");
    };

    if json {
        return print_json(&doc.to_json_object());
    }
    println!("id: {}", doc.id);
    for (k, v) in &doc.fields {
        match v {
            Value::String(s) => println!("{k}: {s}"),
            other => println!("{k}: {other}"),
        }
    }
    Ok(())
}
