//! Package record types
//!
//! Two families of records flow through the pipeline:
//! - `SourcePackage`: an upstream package built from source
//! - `BinaryPackage`: a compiled artifact declaring which source it came from
//!
//! Both carry a store-scoped integer key. Keys are only unique within one
//! staging store; the merger re-bases them so records from different input
//! files never collide.

use serde::{Deserialize, Serialize};

/// Compare two package version strings.
///
/// Byte-wise string ordering, the same ordering the metadata producers
/// apply. This is not a semantic-version comparison: "9" sorts above "10".
pub fn version_newer(candidate: &str, incumbent: &str) -> bool {
    candidate > incumbent
}

/// A source package row as it sits in a staging store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePackage {
    /// Staging key (re-based by the merger, unique within one dataset run)
    pub key: i64,
    /// Package name; at most one version per name survives resolution
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    pub url: Option<String>,
    pub maintainer: Option<String>,
}

impl SourcePackage {
    /// Create a source package with only the fields every row must have
    pub fn new(key: i64, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            version: version.into(),
            license: None,
            url: None,
            maintainer: None,
        }
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.maintainer = Some(maintainer.into());
        self
    }
}

/// A binary package row as it sits in a staging store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryPackage {
    /// Staging key (re-based by the merger, unique within one dataset run)
    pub key: i64,
    pub name: String,
    pub version: String,
    /// Name of the source package this binary claims to be built from
    pub src_name: Option<String>,
}

impl BinaryPackage {
    pub fn new(
        key: i64,
        name: impl Into<String>,
        version: impl Into<String>,
        src_name: Option<String>,
    ) -> Self {
        Self {
            key,
            name: name.into(),
            version: version.into(),
            src_name,
        }
    }
}

/// A binary package row ready for destination insert.
///
/// `src_id` is set only when the binary is the current version for its
/// (name, declared source) pair; older siblings and orphan binaries are
/// persisted with no source link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedBinary {
    pub name: String,
    pub version: String,
    pub src_id: Option<i64>,
}
