//! Multi-source merger
//!
//! Combines every configured input store into one staging store. Each
//! input file numbers its packages from its own counter, so the merger
//! re-bases keys: records from file N are shifted above the highest key
//! file N-1 produced, and the requires/provides rows that reference them
//! are shifted by the same amount. The result is one staging store with
//! globally unique keys and intact ownership links.

use crate::storage::{MetaStore, StagingStore};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Row counts gathered while merging one dataset's inputs.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MergeStats {
    pub src_stores: usize,
    pub bin_stores: usize,
    pub src_packages: usize,
    pub src_requires: usize,
    pub bin_packages: usize,
    pub bin_requires: usize,
    pub bin_provides: usize,
}

/// Merges input metadata stores into a staging store.
pub struct Merger<'a> {
    staging: &'a mut StagingStore,
}

impl<'a> Merger<'a> {
    pub fn new(staging: &'a mut StagingStore) -> Self {
        Self { staging }
    }

    /// Merge all configured input stores.
    ///
    /// Source-family and binary-family keys run on independent counters.
    /// Any unreadable or malformed input fails the whole merge; a partial
    /// staging store is never handed downstream.
    pub fn run(&mut self, src_stores: &[PathBuf], bin_stores: &[PathBuf]) -> Result<MergeStats> {
        let mut stats = MergeStats::default();

        let mut src_base = 0;
        for path in src_stores {
            src_base = self.merge_source_store(path, src_base, &mut stats)?;
            stats.src_stores += 1;
        }

        let mut bin_base = 0;
        for path in bin_stores {
            bin_base = self.merge_binary_store(path, bin_base, &mut stats)?;
            stats.bin_stores += 1;
        }

        tracing::debug!(
            src_packages = stats.src_packages,
            bin_packages = stats.bin_packages,
            "staging store merged"
        );
        Ok(stats)
    }

    fn merge_source_store(
        &mut self,
        path: &Path,
        base: i64,
        stats: &mut MergeStats,
    ) -> Result<i64> {
        let meta = Self::open_input(path)?;
        let mut packages = meta
            .source_packages()
            .map_err(|e| Self::malformed(path, e))?;
        let mut requires = meta.requires().map_err(|e| Self::malformed(path, e))?;

        let mut next = base;
        for pkg in &mut packages {
            pkg.key += base;
            next = next.max(pkg.key);
        }
        for req in &mut requires {
            req.key += base;
        }

        self.staging.append_source_packages(&packages)?;
        self.staging.append_source_requires(&requires)?;

        stats.src_packages += packages.len();
        stats.src_requires += requires.len();
        tracing::debug!(path = %path.display(), packages = packages.len(), "merged source store");
        Ok(next)
    }

    fn merge_binary_store(
        &mut self,
        path: &Path,
        base: i64,
        stats: &mut MergeStats,
    ) -> Result<i64> {
        let meta = Self::open_input(path)?;
        let mut packages = meta
            .binary_packages()
            .map_err(|e| Self::malformed(path, e))?;
        let mut requires = meta.requires().map_err(|e| Self::malformed(path, e))?;
        let mut provides = meta.provides().map_err(|e| Self::malformed(path, e))?;

        let mut next = base;
        for pkg in &mut packages {
            pkg.key += base;
            next = next.max(pkg.key);
        }
        for req in &mut requires {
            req.key += base;
        }
        for prov in &mut provides {
            prov.key += base;
        }

        self.staging.append_binary_packages(&packages)?;
        self.staging.append_binary_requires(&requires)?;
        self.staging.append_binary_provides(&provides)?;

        stats.bin_packages += packages.len();
        stats.bin_requires += requires.len();
        stats.bin_provides += provides.len();
        tracing::debug!(path = %path.display(), packages = packages.len(), "merged binary store");
        Ok(next)
    }

    fn open_input(path: &Path) -> Result<MetaStore> {
        MetaStore::open(path)
            .map_err(|e| Error::Merge(format!("cannot open {}: {}", path.display(), e)))
    }

    fn malformed(path: &Path, err: Error) -> Error {
        Error::Merge(format!("malformed store {}: {}", path.display(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::collections::HashSet;

    fn write_source_store(path: &Path, packages: &[(i64, &str, &str)], requires: &[(i64, &str)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE packages (
                pkgKey INTEGER PRIMARY KEY, name TEXT, version TEXT,
                license TEXT, url TEXT, maintainer TEXT
            );
            CREATE TABLE requires (id INTEGER PRIMARY KEY AUTOINCREMENT, pkgKey INTEGER, name TEXT);",
        )
        .unwrap();
        for (key, name, version) in packages {
            conn.execute(
                "INSERT INTO packages (pkgKey, name, version) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, name, version],
            )
            .unwrap();
        }
        for (key, name) in requires {
            conn.execute(
                "INSERT INTO requires (pkgKey, name) VALUES (?1, ?2)",
                rusqlite::params![key, name],
            )
            .unwrap();
        }
    }

    fn write_binary_store(
        path: &Path,
        packages: &[(i64, &str, &str, &str)],
        requires: &[(i64, &str)],
        provides: &[(i64, &str)],
    ) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE packages (
                pkgKey INTEGER PRIMARY KEY, name TEXT, version TEXT, src_name TEXT
            );
            CREATE TABLE requires (id INTEGER PRIMARY KEY AUTOINCREMENT, pkgKey INTEGER, name TEXT);
            CREATE TABLE provides (id INTEGER PRIMARY KEY AUTOINCREMENT, pkgKey INTEGER, name TEXT);",
        )
        .unwrap();
        for (key, name, version, src_name) in packages {
            conn.execute(
                "INSERT INTO packages (pkgKey, name, version, src_name) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![key, name, version, src_name],
            )
            .unwrap();
        }
        for (key, name) in requires {
            conn.execute(
                "INSERT INTO requires (pkgKey, name) VALUES (?1, ?2)",
                rusqlite::params![key, name],
            )
            .unwrap();
        }
        for (key, name) in provides {
            conn.execute(
                "INSERT INTO provides (pkgKey, name) VALUES (?1, ?2)",
                rusqlite::params![key, name],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_overlapping_keys_become_unique() {
        let dir = tempfile::tempdir().unwrap();
        let src_a = dir.path().join("src-a.sqlite");
        let src_b = dir.path().join("src-b.sqlite");
        // both files use keys 1 and 2
        write_source_store(&src_a, &[(1, "bash", "5.1"), (2, "zlib", "1.2")], &[(1, "make")]);
        write_source_store(&src_b, &[(1, "curl", "7.8"), (2, "git", "2.40")], &[(2, "gcc")]);
        let bin = dir.path().join("bin.sqlite");
        write_binary_store(&bin, &[(1, "bash", "5.1", "bash")], &[], &[]);

        let mut staging = StagingStore::open_in_memory().unwrap();
        let stats = Merger::new(&mut staging)
            .run(&[src_a, src_b], &[bin])
            .unwrap();

        assert_eq!(stats.src_stores, 2);
        assert_eq!(stats.src_packages, 4);

        let keys: Vec<i64> = staging
            .source_packages()
            .unwrap()
            .iter()
            .map(|p| p.key)
            .collect();
        let unique: HashSet<i64> = keys.iter().copied().collect();
        assert_eq!(keys.len(), unique.len());
    }

    #[test]
    fn test_requires_shifted_with_their_owner() {
        let dir = tempfile::tempdir().unwrap();
        let src_a = dir.path().join("src-a.sqlite");
        let src_b = dir.path().join("src-b.sqlite");
        write_source_store(&src_a, &[(1, "bash", "5.1")], &[]);
        write_source_store(&src_b, &[(1, "curl", "7.8")], &[(1, "openssl")]);
        let bin = dir.path().join("bin.sqlite");
        write_binary_store(&bin, &[], &[], &[]);

        let mut staging = StagingStore::open_in_memory().unwrap();
        Merger::new(&mut staging).run(&[src_a, src_b], &[bin]).unwrap();

        let curl_key = staging
            .source_packages()
            .unwrap()
            .iter()
            .find(|p| p.name == "curl")
            .unwrap()
            .key;
        let requires = staging.source_requires().unwrap();
        assert_eq!(requires.len(), 1);
        assert_eq!(requires[0].key, curl_key);
    }

    #[test]
    fn test_missing_input_fails_whole_merge() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.sqlite");
        write_source_store(&src, &[(1, "bash", "5.1")], &[]);
        let absent = dir.path().join("nope.sqlite");

        let mut staging = StagingStore::open_in_memory().unwrap();
        let result = Merger::new(&mut staging).run(&[src, absent], &[]);
        assert!(matches!(result, Err(Error::Merge(_))));
    }

    #[test]
    fn test_schema_mismatch_fails_whole_merge() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.sqlite");
        Connection::open(&bogus)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x TEXT);")
            .unwrap();

        let mut staging = StagingStore::open_in_memory().unwrap();
        let result = Merger::new(&mut staging).run(&[bogus], &[]);
        assert!(matches!(result, Err(Error::Merge(_))));
    }
}
