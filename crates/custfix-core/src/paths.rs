use crate::error::{CustfixError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CUSTFIX_DIR: &str = ".custfix";
pub const CONFIG_FILE: &str = ".custfix/config.yaml";
pub const STORE_FILE: &str = ".custfix/store.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn custfix_dir(root: &Path) -> PathBuf {
    root.join(CUSTFIX_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path against `root`. Absolute paths pass through.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

// ---------------------------------------------------------------------------
// Collection name validation
// ---------------------------------------------------------------------------

static COLLECTION_RE: OnceLock<Regex> = OnceLock::new();

fn collection_re() -> &'static Regex {
    COLLECTION_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").unwrap())
}

pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 128 || !collection_re().is_match(name) {
        return Err(CustfixError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
