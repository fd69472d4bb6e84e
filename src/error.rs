use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("could not create destination directory {}: {source}", path.display())]
    DestinationCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not list source directory {}: {source}", path.display())]
    SourceListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not copy {} to {}: {source}", from.display(), to.display())]
    FileCopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{field} '{value}' is not a single path segment")]
    UnsafePathSegment { field: &'static str, value: String },

    #[error("source and destination are the same directory: {}", path.display())]
    SameSourceAndDestination { path: PathBuf },

    #[error("database query '{query}' failed: {source}")]
    DatabaseQueryFailed {
        query: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{failed} of {total} runs failed to migrate")]
    RunsFailed { failed: usize, total: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DestinationCreateFailed { .. } => "destination_create_failed",
            Self::SourceListFailed { .. } => "source_list_failed",
            Self::FileCopyFailed { .. } => "file_copy_failed",
            Self::UnsafePathSegment { .. } => "unsafe_path_segment",
            Self::SameSourceAndDestination { .. } => "same_source_and_destination",
            Self::DatabaseQueryFailed { .. } => "database_query_failed",
            Self::RunsFailed { .. } => "runs_failed",
            Self::Config(_) => "config_error",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    pub(crate) fn query(query: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let query = query.into();
        move |source| Self::DatabaseQueryFailed { query, source }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
