pub mod collection;
pub mod config;
pub mod hotspots;
pub mod init;
pub mod reconcile;

use anyhow::Context;
use custfix_core::config::Config;
use custfix_core::store::RedbStore;
use std::path::Path;

/// Open the configured store. The handle closes when dropped.
pub(crate) fn open_store(root: &Path, config: &Config) -> anyhow::Result<RedbStore> {
    let path = config.store_path(root);
    tracing::debug!(path = %path.display(), "opening store");
    RedbStore::open(&path).with_context(|| format!("failed to open store {}", path.display()))
}
