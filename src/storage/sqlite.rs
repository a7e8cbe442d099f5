//! SQLite storage implementation
//!
//! Three store wrappers, one per pipeline stage:
//! - `MetaStore`: read-only handle on an input metadata store
//! - `StagingStore`: the merged per-dataset staging file
//! - `DepotStore`: the destination store consumers query

use super::schema;
use crate::capability::{CapabilityRow, Provision, Requirement};
use crate::package::{BinaryPackage, LinkedBinary, SourcePackage};
use crate::{Error, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Read-only handle on one input metadata store.
///
/// Input stores carry repository metadata in three tables: `packages`,
/// `requires`, and (for binary stores) `provides`. Keys in them are only
/// unique per file; the merger re-bases them before staging.
pub struct MetaStore {
    conn: Connection,
}

impl MetaStore {
    /// Open an existing metadata store read-only
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// All source package rows in this store
    pub fn source_packages(&self) -> Result<Vec<SourcePackage>> {
        let mut stmt = self.conn.prepare(
            "SELECT pkgKey, name, version, license, url, maintainer FROM packages",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SourcePackage {
                    key: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    license: row.get(3)?,
                    url: row.get(4)?,
                    maintainer: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All binary package rows in this store
    pub fn binary_packages(&self) -> Result<Vec<BinaryPackage>> {
        let mut stmt = self
            .conn
            .prepare("SELECT pkgKey, name, version, src_name FROM packages")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BinaryPackage {
                    key: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    src_name: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All requirement rows in this store
    pub fn requires(&self) -> Result<Vec<CapabilityRow>> {
        self.capability_rows("requires")
    }

    /// All provision rows in this store
    pub fn provides(&self) -> Result<Vec<CapabilityRow>> {
        self.capability_rows("provides")
    }

    fn capability_rows(&self, table: &str) -> Result<Vec<CapabilityRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT pkgKey, name FROM {}", table))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CapabilityRow {
                    key: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// The merged staging store for one dataset run.
pub struct StagingStore {
    conn: Connection,
}

impl StagingStore {
    /// Create a fresh staging store, replacing any stale file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open an in-memory staging store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        for stmt in schema::staging_statements() {
            conn.execute(stmt, [])
                .map_err(|e| Error::Schema(e.to_string()))?;
        }
        Ok(Self { conn })
    }

    pub fn append_source_packages(&mut self, rows: &[SourcePackage]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO src_package (pkgKey, name, version, license, url, maintainer)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.key,
                    row.name,
                    row.version,
                    row.license,
                    row.url,
                    row.maintainer,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn append_binary_packages(&mut self, rows: &[BinaryPackage]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO bin_package (pkgKey, name, version, src_name) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(params![row.key, row.name, row.version, row.src_name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn append_source_requires(&mut self, rows: &[CapabilityRow]) -> Result<()> {
        self.append_capabilities("src_requires", rows)
    }

    pub fn append_binary_requires(&mut self, rows: &[CapabilityRow]) -> Result<()> {
        self.append_capabilities("bin_requires", rows)
    }

    pub fn append_binary_provides(&mut self, rows: &[CapabilityRow]) -> Result<()> {
        self.append_capabilities("bin_provides", rows)
    }

    fn append_capabilities(&mut self, table: &str, rows: &[CapabilityRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {} (pkgKey, name) VALUES (?1, ?2)", table))?;
            for row in rows {
                stmt.execute(params![row.key, row.name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn source_packages(&self) -> Result<Vec<SourcePackage>> {
        let mut stmt = self.conn.prepare(
            "SELECT pkgKey, name, version, license, url, maintainer FROM src_package",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SourcePackage {
                    key: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    license: row.get(3)?,
                    url: row.get(4)?,
                    maintainer: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn binary_packages(&self) -> Result<Vec<BinaryPackage>> {
        let mut stmt = self
            .conn
            .prepare("SELECT pkgKey, name, version, src_name FROM bin_package")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BinaryPackage {
                    key: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    src_name: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn source_requires(&self) -> Result<Vec<CapabilityRow>> {
        self.capability_rows("src_requires")
    }

    pub fn binary_requires(&self) -> Result<Vec<CapabilityRow>> {
        self.capability_rows("bin_requires")
    }

    pub fn binary_provides(&self) -> Result<Vec<CapabilityRow>> {
        self.capability_rows("bin_provides")
    }

    fn capability_rows(&self, table: &str) -> Result<Vec<CapabilityRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT pkgKey, name FROM {}", table))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CapabilityRow {
                    key: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// A persisted source package row.
#[derive(Debug, Clone)]
pub struct SourcePackRow {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    pub url: Option<String>,
    pub maintainer: Option<String>,
}

/// A persisted binary package row.
#[derive(Debug, Clone)]
pub struct BinPackRow {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub src_id: Option<i64>,
}

/// A persisted provision row.
#[derive(Debug, Clone)]
pub struct ProvisionRow {
    pub id: i64,
    pub name: String,
    pub bin_id: i64,
}

/// A persisted requirement row.
#[derive(Debug, Clone)]
pub struct RequirementRow {
    pub id: i64,
    pub name: String,
    pub src_id: Option<i64>,
    pub bin_id: Option<i64>,
    pub provider_id: i64,
}

/// Row counts of one destination store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DepotStats {
    pub sources: usize,
    pub binaries: usize,
    pub provides: usize,
    pub requires: usize,
}

impl std::fmt::Display for DepotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Depot Statistics:")?;
        writeln!(f, "  Source packages: {}", self.sources)?;
        writeln!(f, "  Binary packages: {}", self.binaries)?;
        writeln!(f, "  Provides: {}", self.provides)?;
        writeln!(f, "  Requires: {}", self.requires)
    }
}

/// The destination store for one dataset.
pub struct DepotStore {
    conn: Connection,
}

impl DepotStore {
    /// Create a fresh destination store for `name`, replacing any stale file
    pub fn create(data_dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = Self::database_path(data_dir, name);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let conn = Connection::open(&path)?;
        Self::initialize(conn)
    }

    /// Open an existing destination store
    pub fn open(data_dir: &Path, name: &str) -> Result<Self> {
        let path = Self::database_path(data_dir, name);
        if !path.exists() {
            return Err(Error::UnknownDataset(name.to_string()));
        }
        Ok(Self {
            conn: Connection::open(&path)?,
        })
    }

    /// Open an in-memory destination store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        for stmt in schema::depot_statements() {
            conn.execute(stmt, [])
                .map_err(|e| Error::Schema(e.to_string()))?;
        }
        Ok(Self { conn })
    }

    /// Where the destination store for `name` lives under `data_dir`
    pub fn database_path(data_dir: &Path, name: &str) -> PathBuf {
        data_dir.join(format!("{}.db", name))
    }

    /// Delete the destination store file; returns whether it existed
    pub fn drop_database(data_dir: &Path, name: &str) -> Result<bool> {
        let path = Self::database_path(data_dir, name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }

    /// Insert source packages, returning assigned ids in input order
    pub fn insert_source_packages(&mut self, rows: &[SourcePackage]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO src_pack (name, version, license, url, maintainer)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| Error::PartialWrite {
                    table: "src_pack",
                    source: e,
                })?;
            for row in rows {
                stmt.execute(params![
                    row.name,
                    row.version,
                    row.license,
                    row.url,
                    row.maintainer,
                ])
                .map_err(|e| Error::PartialWrite {
                    table: "src_pack",
                    source: e,
                })?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Insert binary packages, returning assigned ids in input order
    pub fn insert_binary_packages(&mut self, rows: &[LinkedBinary]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx
                .prepare("INSERT INTO bin_pack (name, version, src_id) VALUES (?1, ?2, ?3)")
                .map_err(|e| Error::PartialWrite {
                    table: "bin_pack",
                    source: e,
                })?;
            for row in rows {
                stmt.execute(params![row.name, row.version, row.src_id])
                    .map_err(|e| Error::PartialWrite {
                        table: "bin_pack",
                        source: e,
                    })?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Insert provisions, returning assigned ids in input order
    pub fn insert_provisions(&mut self, rows: &[Provision]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx
                .prepare("INSERT INTO pack_provides (name, bin_id) VALUES (?1, ?2)")
                .map_err(|e| Error::PartialWrite {
                    table: "pack_provides",
                    source: e,
                })?;
            for row in rows {
                stmt.execute(params![row.name, row.bin_id])
                    .map_err(|e| Error::PartialWrite {
                        table: "pack_provides",
                        source: e,
                    })?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Insert fully linked requirement rows
    pub fn insert_requirements(&mut self, rows: &[Requirement]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO pack_requires (name, src_id, bin_id, provider_id)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| Error::PartialWrite {
                    table: "pack_requires",
                    source: e,
                })?;
            for row in rows {
                stmt.execute(params![row.name, row.src_id, row.bin_id, row.provider_id])
                    .map_err(|e| Error::PartialWrite {
                        table: "pack_requires",
                        source: e,
                    })?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    // ========== Query Operations ==========

    pub fn source_packages(&self) -> Result<Vec<SourcePackRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, version, license, url, maintainer FROM src_pack ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SourcePackRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    license: row.get(3)?,
                    url: row.get(4)?,
                    maintainer: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn binary_packages(&self) -> Result<Vec<BinPackRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, version, src_id FROM bin_pack ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BinPackRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    src_id: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn provisions(&self) -> Result<Vec<ProvisionRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, bin_id FROM pack_provides ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProvisionRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    bin_id: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn requirements(&self) -> Result<Vec<RequirementRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, src_id, bin_id, provider_id FROM pack_requires ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RequirementRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    src_id: row.get(2)?,
                    bin_id: row.get(3)?,
                    provider_id: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Row counts across the four destination tables
    pub fn stats(&self) -> Result<DepotStats> {
        Ok(DepotStats {
            sources: self.count("src_pack")?,
            binaries: self.count("bin_pack")?,
            provides: self.count("pack_provides")?,
            requires: self.count("pack_requires")?,
        })
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}
