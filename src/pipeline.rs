//! Per-dataset import pipeline
//!
//! Each configured dataset runs the same sequence: create a fresh
//! destination store, merge its input stores into a staging store, resolve
//! relationships in memory, persist the linked rows. Datasets are fully
//! isolated: every run owns its own staging file, indices, and destination
//! store, so one failure never disturbs a sibling. On failure the
//! destination for that dataset is deleted outright rather than attempting
//! partial-row cleanup, and the staging file is removed whether the run
//! succeeded or not.

use crate::config::{DatasetConfig, DatasetStatus, ImportConfig};
use crate::ledger::{Ledger, LedgerEntry};
use crate::merge::{MergeStats, Merger};
use crate::persist::{ImportCounts, PersistEngine};
use crate::resolve::DatasetIndices;
use crate::storage::{DepotStore, StagingStore};
use crate::{Error, ImportMessage, Result};
use crossbeam::channel::Sender;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Summary of one successfully imported dataset.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportReport {
    pub dataset: String,
    pub merge: MergeStats,
    pub counts: ImportCounts,
    pub elapsed_ms: u128,
}

/// Result of attempting one configured dataset.
#[derive(Debug)]
pub struct DatasetOutcome {
    pub dataset: DatasetConfig,
    pub result: Result<ImportReport>,
}

impl DatasetOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Where the staging store for `name` lives while its pipeline runs
pub fn staging_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{}.staging", name))
}

/// Run the merge-and-resolve pipeline for one dataset.
///
/// On any failure the destination store is deleted and the error returned;
/// the staging file is removed on every exit path.
pub fn run_dataset(dataset: &DatasetConfig, data_dir: &Path) -> Result<ImportReport> {
    let started = Instant::now();

    if dataset.src_stores.is_empty() || dataset.bin_stores.is_empty() {
        return Err(Error::EmptyInput(dataset.name.clone()));
    }

    let staging = staging_path(data_dir, &dataset.name);
    let result = run_phases(dataset, data_dir, &staging);

    if staging.exists() {
        if let Err(err) = std::fs::remove_file(&staging) {
            tracing::warn!(
                path = %staging.display(),
                "failed to remove staging store: {}",
                err
            );
        }
    }

    match result {
        Ok((merge, counts)) => {
            let report = ImportReport {
                dataset: dataset.name.clone(),
                merge,
                counts,
                elapsed_ms: started.elapsed().as_millis(),
            };
            tracing::info!(
                dataset = %report.dataset,
                sources = report.counts.sources,
                binaries = report.counts.binaries,
                requires = report.counts.requires,
                "dataset imported"
            );
            Ok(report)
        }
        Err(err) => {
            // no partial destination survives a failed import
            if let Err(drop_err) = DepotStore::drop_database(data_dir, &dataset.name) {
                tracing::error!(
                    dataset = %dataset.name,
                    "failed to drop destination after import failure: {}",
                    drop_err
                );
            }
            Err(err)
        }
    }
}

fn run_phases(
    dataset: &DatasetConfig,
    data_dir: &Path,
    staging_path: &Path,
) -> Result<(MergeStats, ImportCounts)> {
    let mut depot = DepotStore::create(data_dir, &dataset.name)?;

    let mut staging = StagingStore::create(staging_path)?;
    let merge = Merger::new(&mut staging).run(&dataset.src_stores, &dataset.bin_stores)?;

    let indices = DatasetIndices::build(&staging)?;
    drop(staging);

    let counts = PersistEngine::new(&mut depot).run(indices)?;
    Ok((merge, counts))
}

/// Run every importable dataset in the configuration.
///
/// Datasets are processed by `jobs` independent workers; each owns its
/// whole pipeline, so no state is shared between concurrent runs. Failures
/// are caught at the dataset boundary: the failed dataset is reported and
/// every other dataset still runs. Successful imports are recorded in the
/// data directory's ledger, which is reset when the batch starts.
pub fn run_batch(
    config: &ImportConfig,
    data_dir: &Path,
    jobs: usize,
    events: Sender<ImportMessage>,
) -> Result<Vec<DatasetOutcome>> {
    config.validate()?;
    std::fs::create_dir_all(data_dir)?;

    let ledger = Ledger::new(data_dir);
    ledger.reset()?;

    let mut runnable = Vec::new();
    for dataset in &config.datasets {
        if dataset.status == DatasetStatus::Disable {
            tracing::debug!(dataset = %dataset.name, "dataset disabled, skipped");
            continue;
        }
        if !dataset.is_importable() {
            tracing::warn!(
                dataset = %dataset.name,
                priority = dataset.priority,
                status = dataset.status.as_str(),
                "dataset has invalid priority or status, skipped"
            );
            continue;
        }
        runnable.push(dataset.clone());
    }

    let jobs = jobs.clamp(1, runnable.len().max(1));
    let (work_tx, work_rx) = crossbeam::channel::unbounded::<(usize, DatasetConfig)>();
    for item in runnable.into_iter().enumerate() {
        let _ = work_tx.send(item);
    }
    drop(work_tx);

    let (done_tx, done_rx) = crossbeam::channel::unbounded::<(usize, DatasetOutcome)>();
    let mut outcomes: Vec<(usize, DatasetOutcome)> = Vec::new();

    std::thread::scope(|scope| {
        for _ in 0..jobs {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            let events = events.clone();
            scope.spawn(move || {
                for (index, dataset) in work_rx.iter() {
                    let _ = events.send(ImportMessage::Started {
                        dataset: dataset.name.clone(),
                    });
                    let result = run_dataset(&dataset, data_dir);
                    let message = match &result {
                        Ok(report) => ImportMessage::Finished {
                            dataset: dataset.name.clone(),
                            sources: report.counts.sources,
                            binaries: report.counts.binaries,
                            provides: report.counts.provides,
                            requires: report.counts.requires,
                        },
                        Err(err) => ImportMessage::Failed {
                            dataset: dataset.name.clone(),
                            reason: err.to_string(),
                        },
                    };
                    let _ = events.send(message);
                    let _ = done_tx.send((index, DatasetOutcome { dataset, result }));
                }
            });
        }
        drop(done_tx);

        for (index, outcome) in done_rx.iter() {
            match &outcome.result {
                Ok(_) => {
                    let entry = LedgerEntry {
                        name: outcome.dataset.name.clone(),
                        priority: outcome.dataset.priority,
                        status: outcome.dataset.status,
                    };
                    if let Err(err) = ledger.record(entry) {
                        tracing::error!(
                            dataset = %outcome.dataset.name,
                            "failed to record imported dataset: {}",
                            err
                        );
                    }
                }
                Err(err) => {
                    tracing::error!(dataset = %outcome.dataset.name, "import failed: {}", err);
                }
            }
            outcomes.push((index, outcome));
        }
    });

    outcomes.sort_by_key(|(index, _)| *index);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
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

    fn dataset(name: &str, src: Vec<PathBuf>, bin: Vec<PathBuf>) -> DatasetConfig {
        DatasetConfig {
            name: name.to_string(),
            priority: 1,
            status: DatasetStatus::Enable,
            src_stores: src,
            bin_stores: bin,
        }
    }

    /// pkgA v1.0 and v2.0 in the first source store, a binary built from
    /// pkgA providing libA.so, a second source store contributing nothing
    /// for pkgA, and a consumer requiring libA.so.
    #[test]
    fn test_worked_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("depot");
        let s1 = dir.path().join("s1.sqlite");
        let s2 = dir.path().join("s2.sqlite");
        let b1 = dir.path().join("b1.sqlite");
        write_source_store(&s1, &[(1, "pkgA", "1.0"), (2, "pkgA", "2.0")], &[]);
        write_source_store(&s2, &[(1, "other", "1.0")], &[]);
        write_binary_store(
            &b1,
            &[
                (1, "pkgA-bin", "2.0", "pkgA"),
                (2, "consumer", "1.0", "other"),
            ],
            &[(2, "libA.so")],
            &[(1, "libA.so")],
        );

        let report = run_dataset(&dataset("main", vec![s1, s2], vec![b1]), &data_dir).unwrap();
        assert_eq!(report.merge.src_stores, 2);
        // staging is gone even on success
        assert!(!staging_path(&data_dir, "main").exists());

        let depot = DepotStore::open(&data_dir, "main").unwrap();

        let sources = depot.source_packages().unwrap();
        let pkg_a = sources.iter().find(|s| s.name == "pkgA").unwrap();
        assert_eq!(pkg_a.version, "2.0");
        assert_eq!(sources.iter().filter(|s| s.name == "pkgA").count(), 1);

        let binaries = depot.binary_packages().unwrap();
        let pkg_a_bin = binaries.iter().find(|b| b.name == "pkgA-bin").unwrap();
        assert_eq!(pkg_a_bin.src_id, Some(pkg_a.id));

        let provisions = depot.provisions().unwrap();
        assert_eq!(provisions.len(), 1);
        assert_eq!(provisions[0].name, "libA.so");
        assert_eq!(provisions[0].bin_id, pkg_a_bin.id);

        let requirements = depot.requirements().unwrap();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].provider_id, provisions[0].id);
        let consumer = binaries.iter().find(|b| b.name == "consumer").unwrap();
        assert_eq!(requirements[0].bin_id, Some(consumer.id));
    }

    #[test]
    fn test_persisted_requirements_never_dangle() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("depot");
        let s1 = dir.path().join("s1.sqlite");
        let b1 = dir.path().join("b1.sqlite");
        write_source_store(&s1, &[(1, "pkgA", "1.0")], &[(1, "libA.so"), (1, "missing.so")]);
        write_binary_store(
            &b1,
            &[(1, "pkgA-bin", "1.0", "pkgA")],
            &[(1, "also-missing.so")],
            &[(1, "libA.so")],
        );

        let report = run_dataset(&dataset("main", vec![s1], vec![b1]), &data_dir).unwrap();
        assert_eq!(report.counts.dropped_requires, 2);

        let depot = DepotStore::open(&data_dir, "main").unwrap();
        let provisions: HashSet<i64> =
            depot.provisions().unwrap().iter().map(|p| p.id).collect();
        let requirements = depot.requirements().unwrap();
        assert_eq!(requirements.len(), 1);
        for requirement in &requirements {
            assert!(provisions.contains(&requirement.provider_id));
            assert!(requirement.src_id.is_some() != requirement.bin_id.is_some());
        }
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_dataset(&dataset("main", vec![], vec![]), dir.path());
        assert!(matches!(result, Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_failed_dataset_leaves_no_destination_or_staging() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("depot");
        let s1 = dir.path().join("s1.sqlite");
        write_source_store(&s1, &[(1, "pkgA", "1.0")], &[]);
        let absent = dir.path().join("absent.sqlite");

        let result = run_dataset(&dataset("broken", vec![s1], vec![absent]), &data_dir);
        assert!(result.is_err());
        assert!(!DepotStore::database_path(&data_dir, "broken").exists());
        assert!(!staging_path(&data_dir, "broken").exists());
    }

    #[test]
    fn test_batch_isolates_failures_and_records_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("depot");
        let s1 = dir.path().join("s1.sqlite");
        let b1 = dir.path().join("b1.sqlite");
        write_source_store(&s1, &[(1, "pkgA", "1.0")], &[]);
        write_binary_store(&b1, &[(1, "pkgA-bin", "1.0", "pkgA")], &[], &[]);
        let absent = dir.path().join("absent.sqlite");

        let config = ImportConfig {
            data_dir: None,
            datasets: vec![
                dataset("good", vec![s1.clone()], vec![b1.clone()]),
                dataset("bad", vec![absent], vec![b1]),
            ],
        };

        let (events_tx, events_rx) = crossbeam::channel::unbounded();
        let outcomes = run_batch(&config, &data_dir, 2, events_tx).unwrap();
        drop(events_rx);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());

        // the good dataset is intact and queryable
        let depot = DepotStore::open(&data_dir, "good").unwrap();
        assert_eq!(depot.stats().unwrap().sources, 1);
        // the bad dataset left nothing behind
        assert!(!DepotStore::database_path(&data_dir, "bad").exists());

        let entries = Ledger::new(&data_dir).load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "good");
    }

    #[test]
    fn test_batch_skips_disabled_and_invalid_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("depot");
        let s1 = dir.path().join("s1.sqlite");
        let b1 = dir.path().join("b1.sqlite");
        write_source_store(&s1, &[(1, "pkgA", "1.0")], &[]);
        write_binary_store(&b1, &[(1, "pkgA-bin", "1.0", "pkgA")], &[], &[]);

        let mut disabled = dataset("disabled", vec![s1.clone()], vec![b1.clone()]);
        disabled.status = DatasetStatus::Disable;
        let mut bad_priority = dataset("bad-priority", vec![s1.clone()], vec![b1.clone()]);
        bad_priority.priority = 500;

        let config = ImportConfig {
            data_dir: None,
            datasets: vec![dataset("good", vec![s1], vec![b1]), disabled, bad_priority],
        };

        let (events_tx, _events_rx) = crossbeam::channel::unbounded();
        let outcomes = run_batch(&config, &data_dir, 1, events_tx).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].dataset.name, "good");
        assert!(!DepotStore::database_path(&data_dir, "disabled").exists());
    }

    #[test]
    fn test_batch_rejects_duplicate_dataset_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = ImportConfig {
            data_dir: None,
            datasets: vec![
                dataset("same", vec![], vec![]),
                dataset("same", vec![], vec![]),
            ],
        };
        let (events_tx, _events_rx) = crossbeam::channel::unbounded();
        let result = run_batch(&config, dir.path(), 1, events_tx);
        assert!(matches!(result, Err(Error::DuplicateDataset(_))));
    }
}
