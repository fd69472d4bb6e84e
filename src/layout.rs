use std::path::{Component, Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::model::{Detector, Experiment, Run};

/// Derives per-run artifact directories under the upload root.
///
/// Layouts:
///   - legacy: `<root>/ex<experiment.id>/<detector.muid>/<project>/<version>`
///   - current: `<root>/<experiment.id>/<detector.id>/<project>/<version>`
#[derive(Debug, Clone)]
pub struct UploadLayout {
    root: PathBuf,
}

impl UploadLayout {
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            root: upload_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject muids that would not land as exactly one directory level under
    /// the root: empty, `.`/`..`, absolute, or containing a separator.
    pub fn check_segments(&self, detector: &Detector, run: &Run) -> Result<()> {
        for (field, value) in [
            ("detector muid", detector.muid.as_str()),
            ("project muid", run.project_muid.as_str()),
            ("version muid", run.version_muid.as_str()),
        ] {
            if !is_single_segment(value) {
                return Err(MigrateError::UnsafePathSegment {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Directory the run's artifacts were uploaded to before the migration.
    pub fn legacy_run_dir(&self, experiment: &Experiment, detector: &Detector, run: &Run) -> PathBuf {
        self.root
            .join(format!("ex{}", experiment.id))
            .join(&detector.muid)
            .join(&run.project_muid)
            .join(&run.version_muid)
    }

    /// Directory the run's artifacts live in after the migration.
    pub fn run_dir(&self, experiment: &Experiment, detector: &Detector, run: &Run) -> PathBuf {
        self.root
            .join(experiment.id.to_string())
            .join(detector.id.to_string())
            .join(&run.project_muid)
            .join(&run.version_muid)
    }
}

fn is_single_segment(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == value
    )
}
