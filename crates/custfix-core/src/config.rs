use crate::error::{CustfixError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file, relative to the project root unless absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(paths::STORE_FILE)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Resolve names from a second collection keyed by customer id.
    #[default]
    CrossCollection,
    /// Resolve names from the candidate's own fields.
    SameRecord,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CrossCollection => "cross_collection",
            Strategy::SameRecord => "same_record",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cross_collection" | "cross-collection" => Ok(Strategy::CrossCollection),
            "same_record" | "same-record" => Ok(Strategy::SameRecord),
            other => Err(format!(
                "unknown strategy '{other}' (expected cross_collection or same_record)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ReconcileConfig
// ---------------------------------------------------------------------------

pub const DEFAULT_PLACEHOLDER: &str = "Unknown Customer";
pub const DEFAULT_UPDATED_BY: &str = "fix_unknown_customers_script";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_source_collection")]
    pub source_collection: String,
    #[serde(default = "default_lookup_collection")]
    pub lookup_collection: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_name_fields")]
    pub name_fields: Vec<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_updated_by")]
    pub updated_by: String,
}

fn default_source_collection() -> String {
    "customers".to_string()
}

fn default_lookup_collection() -> String {
    "normalized_customers".to_string()
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_name_fields() -> Vec<String> {
    vec![
        "name".to_string(),
        "customer_name".to_string(),
        "company_name".to_string(),
    ]
}

fn default_id_field() -> String {
    "customer_id".to_string()
}

fn default_updated_by() -> String {
    DEFAULT_UPDATED_BY.to_string()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            source_collection: default_source_collection(),
            lookup_collection: default_lookup_collection(),
            placeholder: default_placeholder(),
            name_fields: default_name_fields(),
            id_field: default_id_field(),
            updated_by: default_updated_by(),
        }
    }
}

// ---------------------------------------------------------------------------
// HotspotConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotConfig {
    #[serde(default = "default_pdf")]
    pub pdf: PathBuf,
    #[serde(default)]
    pub skus: Vec<String>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_pdf() -> PathBuf {
    PathBuf::from("catalogue.pdf")
}

fn default_output() -> PathBuf {
    PathBuf::from("hotspots.json")
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            pdf: default_pdf(),
            skus: Vec::new(),
            output: default_output(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub hotspots: HotspotConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            store: StoreConfig::default(),
            reconcile: ReconcileConfig::default(),
            hotspots: HotspotConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CustfixError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(CustfixError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.store.path)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let rc = &self.reconcile;

        for (key, name) in [
            ("source_collection", &rc.source_collection),
            ("lookup_collection", &rc.lookup_collection),
        ] {
            if let Err(e) = paths::validate_collection_name(name) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("reconcile.{key}: {e}"),
                });
            }
        }

        if rc.strategy == Strategy::CrossCollection && rc.source_collection == rc.lookup_collection
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "source and lookup collection are both '{}' under cross_collection",
                    rc.source_collection
                ),
            });
        }

        if rc.placeholder.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "reconcile.placeholder must not be empty".to_string(),
            });
        }

        if rc.name_fields.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "reconcile.name_fields must list at least one field".to_string(),
            });
        }

        if rc.name_fields.iter().any(|f| f == &rc.placeholder) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "placeholder '{}' is listed as a name field",
                    rc.placeholder
                ),
            });
        }

        if rc.id_field.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "reconcile.id_field must not be empty".to_string(),
            });
        }

        if rc.updated_by.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "reconcile.updated_by is empty; updates will carry no provenance"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.reconcile.source_collection, "customers");
        assert_eq!(parsed.reconcile.lookup_collection, "normalized_customers");
        assert_eq!(parsed.reconcile.placeholder, "Unknown Customer");
        assert_eq!(
            parsed.reconcile.name_fields,
            vec!["name", "customer_name", "company_name"]
        );
        assert_eq!(parsed.reconcile.strategy, Strategy::CrossCollection);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "reconcile:\n  strategy: same_record\n  source_collection: clients\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.reconcile.strategy, Strategy::SameRecord);
        assert_eq!(cfg.reconcile.source_collection, "clients");
        assert_eq!(cfg.reconcile.lookup_collection, "normalized_customers");
        assert_eq!(cfg.reconcile.updated_by, "fix_unknown_customers_script");
        assert_eq!(cfg.store.path, PathBuf::from(".custfix/store.redb"));
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CustfixError::NotInitialized)
        ));
        let cfg = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.reconcile.id_field, "customer_id");
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.hotspots.skus = vec!["9479".to_string(), "17468".to_string()];
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.hotspots.skus, vec!["9479", "17468"]);
    }

    #[test]
    fn strategy_parses_both_spellings() {
        assert_eq!(
            "cross-collection".parse::<Strategy>().unwrap(),
            Strategy::CrossCollection
        );
        assert_eq!(
            "same_record".parse::<Strategy>().unwrap(),
            Strategy::SameRecord
        );
        assert!("simple".parse::<Strategy>().is_err());
    }

    #[test]
    fn validate_default_config_no_warnings() {
        let warnings = Config::default().validate();
        assert!(warnings.is_empty(), "unexpected: {warnings:?}");
    }

    #[test]
    fn validate_empty_collection_is_error() {
        let mut cfg = Config::default();
        cfg.reconcile.lookup_collection = String::new();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("lookup_collection")));
    }

    #[test]
    fn validate_same_collections_warns_only_for_cross_collection() {
        let mut cfg = Config::default();
        cfg.reconcile.lookup_collection = "customers".to_string();
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);

        cfg.reconcile.strategy = Strategy::SameRecord;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_empty_name_fields_is_error() {
        let mut cfg = Config::default();
        cfg.reconcile.name_fields.clear();
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("name_fields")));
    }
}
