use serde::{Deserialize, Serialize};

/// A static-analysis detector. `muid` is the legacy path component, `id`
/// the numeric key used by the new upload layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detector {
    pub id: u64,
    pub muid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: u64,
}

/// One execution of a detector against a project version within an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub detector_id: u64,
    pub experiment_id: u64,
    pub project_muid: String,
    pub version_muid: String,
}

impl Detector {
    pub fn new(id: u64, muid: impl Into<String>) -> Self {
        Self {
            id,
            muid: muid.into(),
        }
    }
}

impl Run {
    pub fn new(
        id: u64,
        detector: &Detector,
        experiment: Experiment,
        project_muid: impl Into<String>,
        version_muid: impl Into<String>,
    ) -> Self {
        Self {
            id,
            detector_id: detector.id,
            experiment_id: experiment.id,
            project_muid: project_muid.into(),
            version_muid: version_muid.into(),
        }
    }
}
