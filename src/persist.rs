//! Persistence and linking engine
//!
//! Writes the resolved indices into the destination store in five strictly
//! ordered phases. The order is a data dependency, not a style choice:
//! binary rows need the source ids assigned in phase 1, provision rows
//! need the binary ids assigned in phase 2, and requirement rows need the
//! provision ids assigned in phase 4.
//!
//! Requirements are linked through a deferred join: placeholders
//! accumulate in a pending map keyed by capability name while packages are
//! written, then fan out to one row per matching provision once all
//! provisions exist. Placeholders whose capability no provision exports
//! are logged and dropped; the destination never holds a requirement
//! without a provider.

use crate::capability::{PendingRequirement, Provision, Requirement};
use crate::package::{LinkedBinary, SourcePackage};
use crate::resolve::DatasetIndices;
use crate::storage::DepotStore;
use crate::Result;
use std::collections::{HashMap, HashSet};

/// Rows written (and requirements dropped) for one dataset.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ImportCounts {
    pub sources: usize,
    pub binaries: usize,
    pub provides: usize,
    pub requires: usize,
    pub dropped_requires: usize,
}

/// Writes one dataset's indices into its destination store.
pub struct PersistEngine<'a> {
    depot: &'a mut DepotStore,
    pending: HashMap<String, Vec<PendingRequirement>>,
}

impl<'a> PersistEngine<'a> {
    pub fn new(depot: &'a mut DepotStore) -> Self {
        Self {
            depot,
            pending: HashMap::new(),
        }
    }

    pub fn run(mut self, mut indices: DatasetIndices) -> Result<ImportCounts> {
        // Phase 1: champion source packages
        let mut champions: Vec<SourcePackage> =
            indices.src_champions.values().cloned().collect();
        champions.sort_by(|a, b| a.name.cmp(&b.name));
        let src_ids = self.depot.insert_source_packages(&champions)?;

        // Phase 2: binary packages, grouped under the source they declare.
        // Source-level requirement placeholders are emitted on the way.
        let mut binaries: Vec<LinkedBinary> = Vec::new();
        for (pkg, src_id) in champions.iter().zip(&src_ids) {
            if let Some(group) = indices.bin_groups.remove(&pkg.name) {
                for member in group {
                    binaries.push(LinkedBinary {
                        name: member.name,
                        version: member.version,
                        src_id: if member.is_current { Some(*src_id) } else { None },
                    });
                }
            }
            for capability in indices.src_requires.remove(&pkg.name).unwrap_or_default() {
                self.pending
                    .entry(capability.clone())
                    .or_default()
                    .push(PendingRequirement::from_source(capability, *src_id));
            }
        }

        // Orphan binaries: declared source matched no champion. Persisted
        // without a source link.
        let mut orphan_groups: Vec<_> = indices.bin_groups.drain().collect();
        orphan_groups.sort_by(|a, b| a.0.cmp(&b.0));
        for (src_name, group) in orphan_groups {
            tracing::debug!(
                declared_source = %src_name,
                binaries = group.len(),
                "orphan binary group persisted without source link"
            );
            for member in group {
                binaries.push(LinkedBinary {
                    name: member.name,
                    version: member.version,
                    src_id: None,
                });
            }
        }
        let bin_ids = self.depot.insert_binary_packages(&binaries)?;

        // Phase 3 + 4: provisions and binary-level requirement placeholders
        let mut provisions: Vec<Provision> = Vec::new();
        for (binary, bin_id) in binaries.iter().zip(&bin_ids) {
            let Some(key) = indices.bin_key_by_name.get(&binary.name) else {
                continue;
            };
            if let Some(capabilities) = indices.bin_requires.get(key) {
                for capability in capabilities {
                    self.pending
                        .entry(capability.clone())
                        .or_default()
                        .push(PendingRequirement::from_binary(capability.clone(), *bin_id));
                }
            }
            if let Some(capabilities) = indices.bin_provides.get(key) {
                for capability in capabilities {
                    provisions.push(Provision {
                        name: capability.clone(),
                        bin_id: *bin_id,
                    });
                }
            }
        }
        let prov_ids = self.depot.insert_provisions(&provisions)?;

        // Phase 5: join placeholders against provisions by capability name.
        // Fan-out: one requirement row per matching provision.
        let mut requirements: Vec<Requirement> = Vec::new();
        for (provision, prov_id) in provisions.iter().zip(&prov_ids) {
            if let Some(placeholders) = self.pending.get(&provision.name) {
                for placeholder in placeholders {
                    requirements.push(placeholder.resolve(*prov_id));
                }
            }
        }

        let provided: HashSet<&str> = provisions.iter().map(|p| p.name.as_str()).collect();
        let mut dropped = 0;
        for (capability, placeholders) in &self.pending {
            if !provided.contains(capability.as_str()) {
                dropped += placeholders.len();
                tracing::debug!(
                    capability = %capability,
                    count = placeholders.len(),
                    "no provider for capability, requirements dropped"
                );
            }
        }

        let requires = self.depot.insert_requirements(&requirements)?;

        Ok(ImportCounts {
            sources: champions.len(),
            binaries: binaries.len(),
            provides: provisions.len(),
            requires,
            dropped_requires: dropped,
        })
    }
}
