use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::layout::UploadLayout;
use crate::migrator::{MigrateOptions, MigrationReport, Migrator};
use crate::output::{Format, print_report};
use crate::store::catalog::SqliteCatalog;
use crate::store::lock::MigrationLock;

/// Run the upload migration once and print the report.
///
/// Returns `RunsFailed` after printing when any run could not be migrated,
/// so the process exits non-zero while the report is still emitted.
pub fn run(
    config: &Config,
    options: MigrateOptions,
    audit_dir: Option<&Path>,
    format: Format,
) -> Result<()> {
    let lock = config
        .lock_file
        .as_deref()
        .map(MigrationLock::acquire)
        .transpose()?;

    let outcome = migrate(config, options, audit_dir, format);
    let released = lock.map_or(Ok(()), MigrationLock::release);
    outcome?;
    released
}

fn migrate(
    config: &Config,
    options: MigrateOptions,
    audit_dir: Option<&Path>,
    format: Format,
) -> Result<()> {
    let catalog = SqliteCatalog::open(&config.database.path, &config.database.table_prefix)?;
    let report = Migrator::new(&catalog, UploadLayout::new(&config.upload_root))
        .with_options(options)
        .run()?;

    print_report(&report, format)?;

    if let Some(dir) = audit_dir {
        let path = write_audit_report(dir, &report)?;
        info!(path = %path.display(), "wrote migration audit report");
    }

    report.ensure_success()
}

fn write_audit_report(dir: &Path, report: &MigrationReport) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let timestamp = Utc::now();
    let path = dir.join(format!(
        "upload-migration-{}.json",
        timestamp.format("%Y%m%dT%H%M%SZ")
    ));

    let payload = json!({
        "generated_at": timestamp.to_rfc3339(),
        "report": report,
    });

    fs::write(&path, serde_json::to_string_pretty(&payload)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::error::MigrateError;
    use rusqlite::Connection;
    use serde_json::Value;
    use tempfile::tempdir;

    fn seed_database(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE detectors (id INTEGER PRIMARY KEY, muid TEXT NOT NULL);
             CREATE TABLE experiments (id INTEGER PRIMARY KEY);
             CREATE TABLE runs (
                id INTEGER PRIMARY KEY,
                detector_id INTEGER NOT NULL,
                experiment_id INTEGER NOT NULL,
                project_muid TEXT NOT NULL,
                version_muid TEXT NOT NULL
             );
             INSERT INTO detectors VALUES (7, 'pmd');
             INSERT INTO experiments VALUES (3);
             INSERT INTO runs VALUES (1, 7, 3, 'proj1', 'v1');",
        )
        .unwrap();
    }

    fn config(root: &Path) -> Config {
        Config {
            upload_root: root.join("upload"),
            database: DatabaseConfig {
                path: root.join("site.db"),
                table_prefix: String::new(),
            },
            lock_file: Some(root.join("migrate.lock")),
        }
    }

    #[test]
    fn writes_audit_report_with_counts() {
        let dir = tempdir().unwrap();
        seed_database(&dir.path().join("site.db"));
        let legacy = dir.path().join("upload/ex3/pmd/proj1/v1");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join("report.xml"), "<r/>").unwrap();

        let audit_dir = dir.path().join("audit");
        run(
            &config(dir.path()),
            MigrateOptions::default(),
            Some(&audit_dir),
            Format::Json,
        )
        .unwrap();

        let files: Vec<PathBuf> = fs::read_dir(&audit_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let audit: Value = serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(audit["report"]["migrated"], json!(1));
        assert_eq!(audit["report"]["files_copied"], json!(1));
        assert!(audit["generated_at"].is_string());
    }

    #[test]
    fn held_lock_refuses_to_start() {
        let dir = tempdir().unwrap();
        seed_database(&dir.path().join("site.db"));
        fs::create_dir_all(dir.path().join("upload")).unwrap();
        let cfg = config(dir.path());

        let _held = MigrationLock::acquire(cfg.lock_file.as_deref().unwrap()).unwrap();
        let err = run(&cfg, MigrateOptions::default(), None, Format::Json).unwrap_err();
        assert!(matches!(err, MigrateError::Locked(_)));
    }

    #[test]
    fn lock_is_released_after_a_failed_batch() {
        let dir = tempdir().unwrap();
        // No tables: the batch fails on its first query.
        Connection::open(dir.path().join("site.db"))
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();
        fs::create_dir_all(dir.path().join("upload")).unwrap();
        let cfg = config(dir.path());

        let err = run(&cfg, MigrateOptions::default(), None, Format::Json).unwrap_err();
        assert_eq!(err.code(), "database_query_failed");
        MigrationLock::acquire(cfg.lock_file.as_deref().unwrap())
            .unwrap()
            .release()
            .unwrap();
    }
}
