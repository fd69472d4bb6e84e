use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{MigrateError, Result};
use crate::layout::UploadLayout;
use crate::model::{Detector, Experiment, Run};
use crate::store::catalog::Catalog;

/// What to do when a file already exists at the destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Copy over the existing file. Re-running the migration refreshes every copy.
    #[default]
    Replace,
    /// Leave the existing file alone and record it as kept.
    Keep,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MigrateOptions {
    pub dry_run: bool,
    pub overwrite: OverwritePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Migrated,
    /// Dry run: the legacy directory exists and would be copied.
    Planned,
    /// The legacy directory does not exist; nothing to migrate.
    SourceMissing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: u64,
    pub experiment_id: u64,
    pub detector_id: u64,
    pub detector_muid: String,
    pub old_dir: String,
    pub new_dir: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copied: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kept: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub overwrite: OverwritePolicy,
    pub upload_root: String,
    pub experiments: usize,
    pub detectors: usize,
    pub runs_seen: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files_copied: usize,
    pub files_kept: usize,
    /// Every run whose legacy directory existed. Skipped runs are only counted.
    pub runs: Vec<RunReport>,
}

impl MigrationReport {
    fn record(&mut self, run: RunReport) {
        self.runs_seen += 1;
        match run.status {
            RunStatus::SourceMissing => {
                self.skipped += 1;
                return;
            }
            RunStatus::Failed => self.failed += 1,
            RunStatus::Migrated | RunStatus::Planned => self.migrated += 1,
        }
        self.files_copied += run.copied.len();
        self.files_kept += run.kept.len();
        self.runs.push(run);
    }

    /// `Err(RunsFailed)` when any run could not be migrated.
    pub fn ensure_success(&self) -> Result<()> {
        if self.failed == 0 {
            Ok(())
        } else {
            Err(MigrateError::RunsFailed {
                failed: self.failed,
                total: self.runs_seen,
            })
        }
    }
}

/// Copies run artifacts from the legacy upload layout into the id-keyed one.
pub struct Migrator<'a, C: Catalog> {
    catalog: &'a C,
    layout: UploadLayout,
    options: MigrateOptions,
}

impl<'a, C: Catalog> Migrator<'a, C> {
    pub fn new(catalog: &'a C, layout: UploadLayout) -> Self {
        Self {
            catalog,
            layout,
            options: MigrateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MigrateOptions) -> Self {
        self.options = options;
        self
    }

    /// Migrate every run of every (experiment, detector) pair.
    ///
    /// Only catalog failures abort the batch; per-run filesystem failures are
    /// logged and recorded in the report.
    pub fn run(&self) -> Result<MigrationReport> {
        let experiments = self.catalog.experiments()?;
        let detectors = self.catalog.detectors()?;
        info!(
            upload_root = %self.layout.root().display(),
            experiments = experiments.len(),
            detectors = detectors.len(),
            dry_run = self.options.dry_run,
            "starting upload migration"
        );

        let mut report = MigrationReport {
            dry_run: self.options.dry_run,
            overwrite: self.options.overwrite,
            upload_root: self.layout.root().display().to_string(),
            experiments: experiments.len(),
            detectors: detectors.len(),
            ..MigrationReport::default()
        };

        for experiment in &experiments {
            for detector in &detectors {
                for run in self.catalog.runs(detector, experiment)? {
                    report.record(self.migrate_run(experiment, detector, &run));
                }
            }
        }

        info!(
            runs = report.runs_seen,
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed,
            files_copied = report.files_copied,
            "upload migration finished"
        );
        Ok(report)
    }

    /// Migrate a single run. Never fails; errors land in the returned report.
    pub fn migrate_run(&self, experiment: &Experiment, detector: &Detector, run: &Run) -> RunReport {
        let old_dir = self.layout.legacy_run_dir(experiment, detector, run);
        let new_dir = self.layout.run_dir(experiment, detector, run);
        let mut report = RunReport {
            run_id: run.id,
            experiment_id: experiment.id,
            detector_id: detector.id,
            detector_muid: detector.muid.clone(),
            old_dir: old_dir.display().to_string(),
            new_dir: new_dir.display().to_string(),
            status: RunStatus::SourceMissing,
            copied: Vec::new(),
            kept: Vec::new(),
            error_code: None,
            error: None,
        };

        if let Err(err) = self.layout.check_segments(detector, run) {
            record_failure(run, &mut report, err);
            return report;
        }

        if !old_dir.is_dir() {
            debug!(run = run.id, old_dir = %old_dir.display(), "no legacy upload directory");
            return report;
        }

        let outcome = if self.options.dry_run {
            self.plan_copies(&old_dir, &mut report)
        } else {
            self.copy_files(&old_dir, &new_dir, &mut report)
        };

        match outcome {
            Ok(status) => report.status = status,
            Err(err) => record_failure(run, &mut report, err),
        }
        report
    }

    fn plan_copies(&self, old_dir: &Path, report: &mut RunReport) -> Result<RunStatus> {
        for file in list_sources(old_dir)? {
            report.copied.push(file_name(&file));
        }
        Ok(RunStatus::Planned)
    }

    fn copy_files(&self, old_dir: &Path, new_dir: &Path, report: &mut RunReport) -> Result<RunStatus> {
        if old_dir == new_dir {
            return Err(MigrateError::SameSourceAndDestination {
                path: new_dir.to_path_buf(),
            });
        }
        create_run_dir(new_dir).map_err(|source| MigrateError::DestinationCreateFailed {
            path: new_dir.to_path_buf(),
            source,
        })?;
        // Symlinks can still alias the two; copying a file onto itself truncates it.
        if fs::canonicalize(old_dir)? == fs::canonicalize(new_dir)? {
            return Err(MigrateError::SameSourceAndDestination {
                path: new_dir.to_path_buf(),
            });
        }

        for from in list_sources(old_dir)? {
            let Some(name) = from.file_name() else {
                continue;
            };
            let to = new_dir.join(name);
            if self.options.overwrite == OverwritePolicy::Keep && to.exists() {
                warn!(path = %to.display(), "destination exists, keeping it");
                report.kept.push(file_name(&from));
                continue;
            }
            fs::copy(&from, &to).map_err(|source| MigrateError::FileCopyFailed {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            debug!(from = %from.display(), to = %to.display(), "copied");
            report.copied.push(file_name(&from));
        }
        Ok(RunStatus::Migrated)
    }
}

fn record_failure(run: &Run, report: &mut RunReport, err: MigrateError) {
    error!(run = run.id, error = %err, "run migration failed");
    report.status = RunStatus::Failed;
    report.error_code = Some(err.code());
    report.error = Some(err.to_string());
}

fn list_sources(old_dir: &Path) -> Result<Vec<PathBuf>> {
    list_migratable_files(old_dir).map_err(|source| MigrateError::SourceListFailed {
        path: old_dir.to_path_buf(),
        source,
    })
}

/// Display form of the file name, for reports only.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Regular files directly inside `dir` whose name has an extension, sorted by
/// name. Subdirectories are not descended into.
pub fn list_migratable_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .is_some_and(|name| has_extension(&name.to_string_lossy()));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Shell-glob `*.*`: a dot somewhere in the name, hidden files excluded.
pub fn has_extension(name: &str) -> bool {
    !name.starts_with('.') && name.contains('.')
}

#[cfg(unix)]
fn create_run_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o745).create(path)
}

#[cfg(not(unix))]
fn create_run_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}
