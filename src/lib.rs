//! # Pkgdepot - Package Metadata Merge & Resolve Pipeline
//!
//! Pkgdepot ingests per-repository package metadata stores (SQLite files
//! describing source packages, binary packages, and their requires/provides
//! declarations), merges them into one staging store per dataset, resolves
//! the relationships between them, and persists a fully linked destination
//! store that consumers can query for "what does X depend on" and
//! "what provides Y".
//!
//! Pkgdepot provides:
//! - A multi-source merger that re-keys and combines N metadata stores
//! - A relationship resolver that picks one authoritative version per name
//! - A linking engine that joins requirements to providers by capability name
//! - Per-dataset isolation: a failed import never disturbs its siblings

pub mod capability;
pub mod config;
pub mod ledger;
pub mod merge;
pub mod package;
pub mod persist;
pub mod pipeline;
pub mod resolve;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use capability::{Provision, Requirement};
pub use config::{DatasetConfig, ImportConfig};
pub use package::{BinaryPackage, SourcePackage};
pub use resolve::DatasetIndices;
pub use storage::DepotStore;

/// Result type alias for pkgdepot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pkgdepot operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate dataset name: {0}")]
    DuplicateDataset(String),

    #[error("Dataset {0} has no input stores configured")]
    EmptyInput(String),

    #[error("Merge failed: {0}")]
    Merge(String),

    #[error("Schema creation failed: {0}")]
    Schema(String),

    #[error("Partial write to {table}: {source}")]
    PartialWrite {
        table: &'static str,
        source: rusqlite::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
}

/// Message sent from dataset import workers to the coordinator
#[derive(Debug)]
pub enum ImportMessage {
    Started {
        dataset: String,
    },
    Finished {
        dataset: String,
        sources: usize,
        binaries: usize,
        provides: usize,
        requires: usize,
    },
    Failed {
        dataset: String,
        reason: String,
    },
}
