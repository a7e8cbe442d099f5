//! Import configuration
//!
//! The import run is driven by one TOML file listing every dataset to
//! build: a name for the destination store, a priority, an enable switch,
//! and the input metadata stores to merge.
//!
//! ```toml
//! data_dir = "/var/lib/pkgdepot"
//!
//! [[dataset]]
//! name = "mainline"
//! priority = 1
//! status = "enable"
//! src_stores = ["/repo/mainline/src.sqlite"]
//! bin_stores = ["/repo/mainline/bin.sqlite"]
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Whether a configured dataset should be imported.
///
/// Unrecognized values deserialize to `Unknown`; such datasets are skipped
/// with a warning rather than failing the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Enable,
    Disable,
    #[serde(other)]
    Unknown,
}

impl DatasetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Enable => "enable",
            DatasetStatus::Disable => "disable",
            DatasetStatus::Unknown => "unknown",
        }
    }
}

/// One dataset: a destination store built from N source-package stores and
/// M binary-package stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub priority: i64,
    pub status: DatasetStatus,
    #[serde(default)]
    pub src_stores: Vec<PathBuf>,
    #[serde(default)]
    pub bin_stores: Vec<PathBuf>,
}

impl DatasetConfig {
    /// Priority must sit in 0..=100, matching what consumers expect
    pub fn priority_in_range(&self) -> bool {
        (0..=100).contains(&self.priority)
    }

    /// True when this dataset should be attempted by a batch import
    pub fn is_importable(&self) -> bool {
        self.status == DatasetStatus::Enable && self.priority_in_range()
    }
}

/// The full import configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory holding destination stores, staging files, and the ledger
    pub data_dir: Option<PathBuf>,
    #[serde(default, rename = "dataset")]
    pub datasets: Vec<DatasetConfig>,
}

impl ImportConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InvalidConfig(format!(
                "configuration file does not exist: {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: ImportConfig = toml::from_str(&contents)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks: at least one dataset, no duplicate names
    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(Error::InvalidConfig(
                "no datasets configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.name.as_str()) {
                return Err(Error::DuplicateDataset(dataset.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolve the effective data directory: CLI flag wins, then the
    /// config file, then the default
    pub fn resolve_data_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.data_dir.clone())
            .unwrap_or_else(default_data_dir)
    }
}

pub fn default_data_dir() -> PathBuf {
    PathBuf::from("depot")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> ImportConfig {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"
            data_dir = "/tmp/depot"

            [[dataset]]
            name = "mainline"
            priority = 1
            status = "enable"
            src_stores = ["src-a.sqlite", "src-b.sqlite"]
            bin_stores = ["bin.sqlite"]

            [[dataset]]
            name = "updates"
            priority = 2
            status = "disable"
            "#,
        );

        assert_eq!(config.datasets.len(), 2);
        assert_eq!(config.data_dir.as_deref(), Some(Path::new("/tmp/depot")));
        assert!(config.datasets[0].is_importable());
        assert_eq!(config.datasets[0].src_stores.len(), 2);
        assert!(!config.datasets[1].is_importable());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = parse(
            r#"
            [[dataset]]
            name = "mainline"
            priority = 1
            status = "enable"

            [[dataset]]
            name = "mainline"
            priority = 2
            status = "enable"
            "#,
        );

        match config.validate() {
            Err(Error::DuplicateDataset(name)) => assert_eq!(name, "mainline"),
            other => panic!("expected DuplicateDataset, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_empty_config_rejected() {
        let config = parse("");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_status_and_bad_priority_are_skippable() {
        let config = parse(
            r#"
            [[dataset]]
            name = "weird"
            priority = 1
            status = "pending"

            [[dataset]]
            name = "too-high"
            priority = 101
            status = "enable"
            "#,
        );

        assert_eq!(config.datasets[0].status, DatasetStatus::Unknown);
        assert!(!config.datasets[0].is_importable());
        assert!(!config.datasets[1].is_importable());
    }

    #[test]
    fn test_data_dir_resolution_order() {
        let config = parse(r#"data_dir = "from-file""#);
        assert_eq!(
            config.resolve_data_dir(Some(PathBuf::from("from-cli"))),
            PathBuf::from("from-cli")
        );
        assert_eq!(config.resolve_data_dir(None), PathBuf::from("from-file"));
        assert_eq!(
            ImportConfig::default().resolve_data_dir(None),
            default_data_dir()
        );
    }
}
