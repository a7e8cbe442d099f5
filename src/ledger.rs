//! Imported-dataset ledger
//!
//! A small JSON file in the data directory recording which datasets were
//! imported successfully, with the priority and status they were imported
//! under. The ledger is reset at the start of every batch import and only
//! ever lists datasets whose destination store exists in full.

use crate::config::DatasetStatus;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "datasets.json";

/// One successfully imported dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub name: String,
    pub priority: i64,
    pub status: DatasetStatus,
}

/// Handle to the ledger file of one data directory.
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(LEDGER_FILE),
        }
    }

    /// Delete the ledger; the next batch import starts from a clean slate
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// All recorded entries; an absent ledger reads as empty
    pub fn load(&self) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let entries = serde_json::from_str(&contents)
            .map_err(|e| crate::Error::InvalidConfig(format!("{}: {}", self.path.display(), e)))?;
        Ok(entries)
    }

    /// Append one entry
    pub fn record(&self, entry: LedgerEntry) -> Result<()> {
        let mut entries = self.load()?;
        entries.retain(|e| e.name != entry.name);
        entries.push(entry);
        self.write(&entries)
    }

    /// Remove an entry by dataset name; returns whether it was present
    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.name != name);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    fn write(&self, entries: &[LedgerEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, priority: i64) -> LedgerEntry {
        LedgerEntry {
            name: name.to_string(),
            priority,
            status: DatasetStatus::Enable,
        }
    }

    #[test]
    fn test_record_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());

        assert!(ledger.load().unwrap().is_empty());

        ledger.record(entry("mainline", 1)).unwrap();
        ledger.record(entry("updates", 2)).unwrap();

        let entries = ledger.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "mainline");
    }

    #[test]
    fn test_record_replaces_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());

        ledger.record(entry("mainline", 1)).unwrap();
        ledger.record(entry("mainline", 9)).unwrap();

        let entries = ledger.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].priority, 9);
    }

    #[test]
    fn test_remove_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());

        ledger.record(entry("mainline", 1)).unwrap();
        assert!(ledger.remove("mainline").unwrap());
        assert!(!ledger.remove("mainline").unwrap());

        ledger.record(entry("updates", 2)).unwrap();
        ledger.reset().unwrap();
        assert!(ledger.load().unwrap().is_empty());
    }
}
