//! Relationship resolver
//!
//! One scan per entity kind over the staging store builds the in-memory
//! indices the persistence engine consumes. The indices are owned by a
//! single dataset run and discarded with it; nothing here touches the
//! destination store.
//!
//! Resolution rules:
//! - One champion source package per name: the row with the greatest
//!   version string. When a champion is replaced, the staging keys that
//!   pointed at the superseded row are unmapped, so requirements owned by
//!   those keys are dropped rather than attributed to a dead version.
//! - Binary packages group under the source name they declare. Within a
//!   group, same-name binaries compete: only the greatest version keeps
//!   `is_current`, and only current binaries are eligible for a source
//!   link at persist time.

use crate::capability::CapabilityRow;
use crate::package::{version_newer, BinaryPackage, SourcePackage};
use crate::storage::StagingStore;
use crate::Result;
use std::collections::HashMap;

/// A binary package as grouped under its declared source name.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBinary {
    pub name: String,
    pub version: String,
    pub is_current: bool,
}

/// In-memory indices for one dataset run.
#[derive(Debug, Default)]
pub struct DatasetIndices {
    /// Champion source package per name
    pub src_champions: HashMap<String, SourcePackage>,
    /// Staging key -> champion name, for keys belonging to a live champion
    pub src_key_names: HashMap<i64, String>,
    /// Champion name -> source-level required capability names
    pub src_requires: HashMap<String, Vec<String>>,
    /// Declared source name -> binary group
    pub bin_groups: HashMap<String, Vec<GroupedBinary>>,
    /// Binary name -> staging key (last write wins on duplicate names)
    pub bin_key_by_name: HashMap<String, i64>,
    /// Binary staging key -> required capability names
    pub bin_requires: HashMap<i64, Vec<String>>,
    /// Binary staging key -> provided capability names
    pub bin_provides: HashMap<i64, Vec<String>>,
}

impl DatasetIndices {
    /// Build all indices from a staging store
    pub fn build(staging: &StagingStore) -> Result<Self> {
        let mut indices = Self::default();
        for pkg in staging.source_packages()? {
            indices.index_source_package(pkg);
        }
        for req in staging.source_requires()? {
            indices.index_source_require(req);
        }
        for bin in staging.binary_packages()? {
            indices.index_binary_package(bin);
        }
        for req in staging.binary_requires()? {
            indices.index_binary_require(req);
        }
        for prov in staging.binary_provides()? {
            indices.index_binary_provide(prov);
        }
        Ok(indices)
    }

    /// Fold one source package row into the champion index.
    ///
    /// Order-independent: replaying the same rows in any order converges
    /// to the same champion and the same set of live key mappings (the
    /// keys of every row carrying the winning version).
    pub fn index_source_package(&mut self, pkg: SourcePackage) {
        let (wins, same_version) = match self.src_champions.get(&pkg.name) {
            None => (true, false),
            Some(champion) => (
                version_newer(&pkg.version, &champion.version),
                champion.version == pkg.version,
            ),
        };

        if wins {
            // the old champion's keys must not attract requirements
            self.src_key_names.retain(|_, name| *name != pkg.name);
            self.src_key_names.insert(pkg.key, pkg.name.clone());
            self.src_champions.insert(pkg.name.clone(), pkg);
        } else if same_version {
            // duplicate of the champion version from another store
            self.src_key_names.insert(pkg.key, pkg.name.clone());
        } else {
            tracing::debug!(
                name = %pkg.name,
                version = %pkg.version,
                "superseded source package row dropped"
            );
        }
    }

    /// Attribute a source-level requirement to its owning champion.
    /// Requirements owned by superseded keys are dropped.
    pub fn index_source_require(&mut self, req: CapabilityRow) {
        match self.src_key_names.get(&req.key) {
            Some(name) => {
                self.src_requires
                    .entry(name.clone())
                    .or_default()
                    .push(req.name);
            }
            None => {
                tracing::debug!(
                    key = req.key,
                    capability = %req.name,
                    "requirement owned by a superseded source row dropped"
                );
            }
        }
    }

    /// Fold one binary package row into its declared-source group.
    ///
    /// Same-name binaries within a group compete on version: the greatest
    /// keeps `is_current`, every lower sibling is demoted even if it was
    /// marked current earlier in the scan.
    pub fn index_binary_package(&mut self, bin: BinaryPackage) {
        self.bin_key_by_name.insert(bin.name.clone(), bin.key);

        let group = self
            .bin_groups
            .entry(bin.src_name.clone().unwrap_or_default())
            .or_default();

        let mut is_current = true;
        for sibling in group.iter_mut().filter(|g| g.name == bin.name) {
            if version_newer(&bin.version, &sibling.version) {
                sibling.is_current = false;
            } else {
                is_current = false;
            }
        }

        group.push(GroupedBinary {
            name: bin.name,
            version: bin.version,
            is_current,
        });
    }

    pub fn index_binary_require(&mut self, req: CapabilityRow) {
        self.bin_requires.entry(req.key).or_default().push(req.name);
    }

    pub fn index_binary_provide(&mut self, prov: CapabilityRow) {
        self.bin_provides.entry(prov.key).or_default().push(prov.name);
    }
}
