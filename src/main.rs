use std::path::PathBuf;

use clap::Parser;
use reviewsite_migrate::config::{Config, ConfigFile, Overrides};
use reviewsite_migrate::error::Result;
use reviewsite_migrate::migrator::{MigrateOptions, OverwritePolicy};
use reviewsite_migrate::output::Format;

#[derive(Parser)]
#[command(
    name = "reviewsite-migrate",
    version,
    about = "Copy review-site run uploads from muid-keyed to id-keyed directories"
)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, hide = true)]
    pretty: bool,
    /// JSON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Directory holding uploaded run artifacts
    #[arg(long, env = "REVIEWSITE_UPLOAD_ROOT")]
    upload_root: Option<PathBuf>,
    /// Review-site SQLite database
    #[arg(long, env = "REVIEWSITE_DATABASE")]
    database: Option<PathBuf>,
    /// Prefix of the review-site tables
    #[arg(long, env = "REVIEWSITE_TABLE_PREFIX")]
    table_prefix: Option<String>,
    /// Take an exclusive lock on this file while migrating
    #[arg(long, env = "REVIEWSITE_MIGRATE_LOCK")]
    lock_file: Option<PathBuf>,
    /// List what would be copied without touching the filesystem
    #[arg(long)]
    dry_run: bool,
    /// Leave files that already exist at the destination untouched
    #[arg(long)]
    keep_existing: bool,
    /// Write a JSON audit report into this directory
    #[arg(long)]
    audit_dir: Option<PathBuf>,
    /// Log per-file activity
    #[arg(long, short)]
    verbose: bool,
}

fn run(cli: Cli, format: Format) -> Result<()> {
    let file = cli.config.as_deref().map(ConfigFile::load).transpose()?;
    let config = Config::resolve(
        file,
        Overrides {
            upload_root: cli.upload_root,
            database: cli.database,
            table_prefix: cli.table_prefix,
            lock_file: cli.lock_file,
        },
    )?;
    let options = MigrateOptions {
        dry_run: cli.dry_run,
        overwrite: if cli.keep_existing {
            OverwritePolicy::Keep
        } else {
            OverwritePolicy::Replace
        },
    };

    reviewsite_migrate::commands::migrate::run(&config, options, cli.audit_dir.as_deref(), format)
}

fn main() {
    let cli = Cli::parse();
    reviewsite_migrate::logging::init(cli.verbose);
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn keep_existing_and_dry_run_parse() {
        let cli = Cli::try_parse_from([
            "reviewsite-migrate",
            "--upload-root",
            "/data",
            "--database",
            "site.db",
            "--dry-run",
            "--keep-existing",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert!(cli.keep_existing);
        assert_eq!(cli.upload_root, Some(PathBuf::from("/data")));
    }
}
