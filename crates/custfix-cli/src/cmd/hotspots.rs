use crate::output::print_json;
use anyhow::Context;
use custfix_core::config::Config;
use custfix_core::hotspot::{extract_hotspots, write_hotspots};
use custfix_core::paths;
use custfix_core::pdf::PdfTextSearch;
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    pdf: Option<PathBuf>,
    skus: Vec<String>,
    out: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let hs = config.hotspots;

    let pdf = paths::resolve(root, &pdf.unwrap_or(hs.pdf));
    let out = paths::resolve(root, &out.unwrap_or(hs.output));
    let skus = if skus.is_empty() { hs.skus } else { skus };
    if skus.is_empty() {
        anyhow::bail!("no SKUs given: pass --sku or set hotspots.skus in the config");
    }

    let doc = PdfTextSearch::open(&pdf)?;
    let hotspots = extract_hotspots(&doc, &skus)?;
    write_hotspots(&out, &hotspots)
        .with_context(|| format!("failed to write {}", out.display()))?;

    if json {
        print_json(&serde_json::json!({
            "pdf": pdf,
            "output": out,
            "count": hotspots.len(),
        }))?;
    } else {
        println!(
            "Extracted {} hotspots; saved to {}",
            hotspots.len(),
            out.display()
        );
    }
    Ok(())
}
