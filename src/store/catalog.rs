use std::path::Path;

use rusqlite::{Connection, OpenFlags, params};

use crate::error::{MigrateError, Result};
use crate::model::{Detector, Experiment, Run};

/// Read-only view over the review-site tables the migration needs.
pub trait Catalog {
    fn detectors(&self) -> Result<Vec<Detector>>;

    fn experiments(&self) -> Result<Vec<Experiment>>;

    /// Runs of `detector` within `experiment`.
    fn runs(&self, detector: &Detector, experiment: &Experiment) -> Result<Vec<Run>>;
}

/// Catalog backed by the review-site SQLite database.
///
/// Tables are looked up as `<prefix>detectors`, `<prefix>experiments` and
/// `<prefix>runs`; rows come back ordered by id.
pub struct SqliteCatalog {
    conn: Connection,
    prefix: String,
}

impl SqliteCatalog {
    /// Open the database at `path` read-only.
    pub fn open(path: &Path, table_prefix: &str) -> Result<Self> {
        validate_table_prefix(table_prefix)?;
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(MigrateError::query(format!("open {}", path.display())))?;
        Ok(Self {
            conn,
            prefix: table_prefix.to_string(),
        })
    }

    pub fn from_connection(conn: Connection, table_prefix: &str) -> Result<Self> {
        validate_table_prefix(table_prefix)?;
        Ok(Self {
            conn,
            prefix: table_prefix.to_string(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl Catalog for SqliteCatalog {
    fn detectors(&self) -> Result<Vec<Detector>> {
        let sql = format!("SELECT id, muid FROM {} ORDER BY id", self.table("detectors"));
        let on_err = || MigrateError::query("all detectors");
        let mut stmt = self.conn.prepare(&sql).map_err(on_err())?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Detector {
                    id: row.get(0)?,
                    muid: row.get(1)?,
                })
            })
            .map_err(on_err())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(on_err())
    }

    fn experiments(&self) -> Result<Vec<Experiment>> {
        let sql = format!("SELECT id FROM {} ORDER BY id", self.table("experiments"));
        let on_err = || MigrateError::query("all experiments");
        let mut stmt = self.conn.prepare(&sql).map_err(on_err())?;
        let rows = stmt
            .query_map([], |row| Ok(Experiment { id: row.get(0)? }))
            .map_err(on_err())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(on_err())
    }

    fn runs(&self, detector: &Detector, experiment: &Experiment) -> Result<Vec<Run>> {
        let sql = format!(
            "SELECT id, detector_id, experiment_id, project_muid, version_muid
             FROM {} WHERE detector_id = ?1 AND experiment_id = ?2 ORDER BY id",
            self.table("runs")
        );
        let on_err = || {
            MigrateError::query(format!(
                "runs of detector {} in experiment {}",
                detector.id, experiment.id
            ))
        };
        let mut stmt = self.conn.prepare(&sql).map_err(on_err())?;
        let rows = stmt
            .query_map(params![detector.id, experiment.id], |row| {
                Ok(Run {
                    id: row.get(0)?,
                    detector_id: row.get(1)?,
                    experiment_id: row.get(2)?,
                    project_muid: row.get(3)?,
                    version_muid: row.get(4)?,
                })
            })
            .map_err(on_err())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(on_err())
    }
}

/// In-memory catalog, handy for dry runs over hand-built fixtures.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    pub detectors: Vec<Detector>,
    pub experiments: Vec<Experiment>,
    pub runs: Vec<Run>,
}

impl Catalog for MemoryCatalog {
    fn detectors(&self) -> Result<Vec<Detector>> {
        Ok(self.detectors.clone())
    }

    fn experiments(&self) -> Result<Vec<Experiment>> {
        Ok(self.experiments.clone())
    }

    fn runs(&self, detector: &Detector, experiment: &Experiment) -> Result<Vec<Run>> {
        Ok(self
            .runs
            .iter()
            .filter(|run| run.detector_id == detector.id && run.experiment_id == experiment.id)
            .cloned()
            .collect())
    }
}

/// The prefix is spliced into SQL, so only identifier characters are allowed.
pub fn validate_table_prefix(prefix: &str) -> Result<()> {
    if prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(MigrateError::Config(format!(
            "table prefix '{prefix}' may only contain ASCII letters, digits and '_'"
        )))
    }
}
