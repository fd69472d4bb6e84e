use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::store::catalog::validate_table_prefix;

/// Settings file shape. Every field is optional here so flags and
/// environment variables can fill the gaps.
///
/// ```json
/// {
///   "upload_root": "/srv/reviewsite/upload",
///   "database": { "path": "/srv/reviewsite/reviewsite.db", "table_prefix": "mubench_" },
///   "lock_file": "/run/reviewsite-migrate.lock"
/// }
/// ```
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub upload_root: Option<PathBuf>,
    #[serde(default)]
    pub database: DatabaseFile,
    #[serde(default)]
    pub lock_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseFile {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub table_prefix: Option<String>,
}

/// Values supplied on the command line (or through their env fallbacks).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub upload_root: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub table_prefix: Option<String>,
    pub lock_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub table_prefix: String,
}

/// Fully resolved migration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub upload_root: PathBuf,
    pub database: DatabaseConfig,
    pub lock_file: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            MigrateError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl Config {
    /// Merge an optional settings file with overrides. Overrides win.
    pub fn resolve(file: Option<ConfigFile>, overrides: Overrides) -> Result<Self> {
        let file = file.unwrap_or_default();

        let upload_root = overrides
            .upload_root
            .or(file.upload_root)
            .ok_or_else(|| MigrateError::Config("upload root is not set".into()))?;
        let path = overrides
            .database
            .or(file.database.path)
            .ok_or_else(|| MigrateError::Config("database path is not set".into()))?;
        let table_prefix = overrides
            .table_prefix
            .or(file.database.table_prefix)
            .unwrap_or_default();
        validate_table_prefix(&table_prefix)?;

        if !upload_root.is_dir() {
            return Err(MigrateError::Config(format!(
                "upload root {} is not a directory",
                upload_root.display()
            )));
        }

        Ok(Self {
            upload_root,
            database: DatabaseConfig { path, table_prefix },
            lock_file: overrides.lock_file.or(file.lock_file),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_values_are_used_when_no_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("migrate.json");
        fs::write(
            &path,
            serde_json::json!({
                "upload_root": dir.path(),
                "database": { "path": "site.db", "table_prefix": "mubench_icse18_" }
            })
            .to_string(),
        )
        .unwrap();

        let config = Config::resolve(Some(ConfigFile::load(&path).unwrap()), Overrides::default())
            .unwrap();
        assert_eq!(config.upload_root, dir.path());
        assert_eq!(config.database.path, PathBuf::from("site.db"));
        assert_eq!(config.database.table_prefix, "mubench_icse18_");
        assert!(config.lock_file.is_none());
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempdir().unwrap();
        let file = ConfigFile {
            upload_root: Some(PathBuf::from("/does/not/exist")),
            database: DatabaseFile {
                path: Some("file.db".into()),
                table_prefix: Some("old_".into()),
            },
            lock_file: None,
        };
        let overrides = Overrides {
            upload_root: Some(dir.path().to_path_buf()),
            database: Some("flag.db".into()),
            table_prefix: Some("new_".into()),
            lock_file: Some(dir.path().join("lock")),
        };

        let config = Config::resolve(Some(file), overrides).unwrap();
        assert_eq!(config.upload_root, dir.path());
        assert_eq!(config.database.path, PathBuf::from("flag.db"));
        assert_eq!(config.database.table_prefix, "new_");
        assert_eq!(config.lock_file, Some(dir.path().join("lock")));
    }

    #[test]
    fn missing_upload_root_is_a_config_error() {
        let overrides = Overrides {
            database: Some("site.db".into()),
            ..Overrides::default()
        };
        let err = Config::resolve(None, overrides).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn upload_root_must_exist() {
        let dir = tempdir().unwrap();
        let overrides = Overrides {
            upload_root: Some(dir.path().join("missing")),
            database: Some("site.db".into()),
            ..Overrides::default()
        };
        let err = Config::resolve(None, overrides).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("migrate.json");
        fs::write(&path, r#"{"upload": "/data"}"#).unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert_eq!(err.code(), "json_error");
    }
}
