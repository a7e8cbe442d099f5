//! Database schema definitions
//!
//! Two schemas live here: the staging schema (merged copy of the input
//! stores, store-scoped keys re-based) and the destination schema
//! (surrogate ids and foreign keys, the shape consumers query).

/// SQL to create the staging source-package table
pub const CREATE_STAGING_SRC_PACKAGE: &str = r#"
CREATE TABLE IF NOT EXISTS src_package (
    pkgKey INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    license TEXT,
    url TEXT,
    maintainer TEXT
)
"#;

/// SQL to create the staging source-requirement table
pub const CREATE_STAGING_SRC_REQUIRES: &str = r#"
CREATE TABLE IF NOT EXISTS src_requires (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pkgKey INTEGER NOT NULL,
    name TEXT NOT NULL
)
"#;

/// SQL to create the staging binary-package table
pub const CREATE_STAGING_BIN_PACKAGE: &str = r#"
CREATE TABLE IF NOT EXISTS bin_package (
    pkgKey INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    src_name TEXT
)
"#;

/// SQL to create the staging binary-requirement table
pub const CREATE_STAGING_BIN_REQUIRES: &str = r#"
CREATE TABLE IF NOT EXISTS bin_requires (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pkgKey INTEGER NOT NULL,
    name TEXT NOT NULL
)
"#;

/// SQL to create the staging binary-provision table
pub const CREATE_STAGING_BIN_PROVIDES: &str = r#"
CREATE TABLE IF NOT EXISTS bin_provides (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pkgKey INTEGER NOT NULL,
    name TEXT NOT NULL
)
"#;

/// SQL to create the destination source-package table
pub const CREATE_DEPOT_SRC_PACK: &str = r#"
CREATE TABLE IF NOT EXISTS src_pack (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    license TEXT,
    url TEXT,
    maintainer TEXT
)
"#;

/// SQL to create the destination binary-package table.
/// src_id is NULL for superseded versions and orphan binaries.
pub const CREATE_DEPOT_BIN_PACK: &str = r#"
CREATE TABLE IF NOT EXISTS bin_pack (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    src_id INTEGER REFERENCES src_pack(id)
)
"#;

/// SQL to create the destination provision table
pub const CREATE_DEPOT_PACK_PROVIDES: &str = r#"
CREATE TABLE IF NOT EXISTS pack_provides (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    bin_id INTEGER NOT NULL REFERENCES bin_pack(id)
)
"#;

/// SQL to create the destination requirement table.
/// Exactly one of src_id/bin_id owns each row, and every row points at a
/// provision; unresolvable requirements are never persisted.
pub const CREATE_DEPOT_PACK_REQUIRES: &str = r#"
CREATE TABLE IF NOT EXISTS pack_requires (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    src_id INTEGER REFERENCES src_pack(id),
    bin_id INTEGER REFERENCES bin_pack(id),
    provider_id INTEGER NOT NULL REFERENCES pack_provides(id),
    CHECK ((src_id IS NULL) <> (bin_id IS NULL))
)
"#;

/// SQL to create staging indexes
pub const CREATE_STAGING_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_src_requires_key ON src_requires(pkgKey)",
    "CREATE INDEX IF NOT EXISTS idx_bin_requires_key ON bin_requires(pkgKey)",
    "CREATE INDEX IF NOT EXISTS idx_bin_provides_key ON bin_provides(pkgKey)",
];

/// SQL to create destination indexes
pub const CREATE_DEPOT_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_src_pack_name ON src_pack(name)",
    "CREATE INDEX IF NOT EXISTS idx_bin_pack_name ON bin_pack(name)",
    "CREATE INDEX IF NOT EXISTS idx_bin_pack_src ON bin_pack(src_id)",
    "CREATE INDEX IF NOT EXISTS idx_provides_name ON pack_provides(name)",
    "CREATE INDEX IF NOT EXISTS idx_requires_name ON pack_requires(name)",
    "CREATE INDEX IF NOT EXISTS idx_requires_provider ON pack_requires(provider_id)",
];

/// All staging schema creation statements
pub fn staging_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_STAGING_SRC_PACKAGE,
        CREATE_STAGING_SRC_REQUIRES,
        CREATE_STAGING_BIN_PACKAGE,
        CREATE_STAGING_BIN_REQUIRES,
        CREATE_STAGING_BIN_PROVIDES,
    ];
    stmts.extend(CREATE_STAGING_INDEXES.iter().copied());
    stmts
}

/// All destination schema creation statements
pub fn depot_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_DEPOT_SRC_PACK,
        CREATE_DEPOT_BIN_PACK,
        CREATE_DEPOT_PACK_PROVIDES,
        CREATE_DEPOT_PACK_REQUIRES,
    ];
    stmts.extend(CREATE_DEPOT_INDEXES.iter().copied());
    stmts
}
