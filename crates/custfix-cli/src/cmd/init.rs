use crate::output::print_json;
use anyhow::Context;
use custfix_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    io::ensure_dir(&paths::custfix_dir(root)).context("failed to create .custfix/")?;

    let config_path = paths::config_path(root);
    let created_config = !config_path.exists();
    let config = if created_config {
        let config = Config::default();
        config.save(root).context("failed to write config")?;
        config
    } else {
        Config::load(root).context("failed to load existing config")?
    };

    let store_path = config.store_path(root);
    drop(super::open_store(root, &config)?);

    if json {
        print_json(&serde_json::json!({
            "config": config_path,
            "config_created": created_config,
            "store": store_path,
        }))?;
    } else {
        if created_config {
            println!("Wrote {}", config_path.display());
        } else {
            println!("Config already present at {}", config_path.display());
        }
        println!("Store ready at {}", store_path.display());
    }
    Ok(())
}
