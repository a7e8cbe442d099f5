//! Capability types - requirements and provisions
//!
//! A capability is a symbolic name a binary package exports (`Provision`)
//! or a package of either kind declares it needs (`Requirement`). Linking
//! is exact name matching: a requirement fans out to one persisted row per
//! provision sharing its name.

use serde::{Deserialize, Serialize};

/// A requires/provides row as it sits in a staging store.
///
/// `key` is the staging key of the owning package, re-based together with
/// the package rows so the ownership link survives the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRow {
    pub key: i64,
    pub name: String,
}

impl CapabilityRow {
    pub fn new(key: i64, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }
}

/// A requirement waiting for its provider id.
///
/// Exactly one of `src_id`/`bin_id` is set. Placeholders accumulate in a
/// pending map keyed by capability name for the whole dataset run and are
/// only promoted to `Requirement` rows once a matching provision exists.
#[derive(Debug, Clone)]
pub struct PendingRequirement {
    pub name: String,
    pub src_id: Option<i64>,
    pub bin_id: Option<i64>,
}

impl PendingRequirement {
    /// Placeholder owned by a source package
    pub fn from_source(name: impl Into<String>, src_id: i64) -> Self {
        Self {
            name: name.into(),
            src_id: Some(src_id),
            bin_id: None,
        }
    }

    /// Placeholder owned by a binary package
    pub fn from_binary(name: impl Into<String>, bin_id: i64) -> Self {
        Self {
            name: name.into(),
            src_id: None,
            bin_id: Some(bin_id),
        }
    }

    /// Stamp a provider id, producing a row ready for insert
    pub fn resolve(&self, provider_id: i64) -> Requirement {
        Requirement {
            name: self.name.clone(),
            src_id: self.src_id,
            bin_id: self.bin_id,
            provider_id,
        }
    }
}

/// A fully linked requirement row ready for destination insert.
#[derive(Debug, Clone, Serialize)]
pub struct Requirement {
    pub name: String,
    pub src_id: Option<i64>,
    pub bin_id: Option<i64>,
    pub provider_id: i64,
}

/// A provision row ready for destination insert.
#[derive(Debug, Clone, Serialize)]
pub struct Provision {
    pub name: String,
    pub bin_id: i64,
}
