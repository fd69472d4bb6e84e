use clap::ValueEnum;
use colored::Colorize;

use crate::error::Result;
use crate::migrator::{MigrationReport, RunReport, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

pub fn print_report(report: &MigrationReport, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        Format::Pretty => {
            let title = if report.dry_run {
                "Upload migration (dry run)"
            } else {
                "Upload migration"
            };
            println!("{} {}", title.bold(), report.upload_root);
            println!(
                "  {} experiments x {} detectors, {} runs",
                report.experiments, report.detectors, report.runs_seen
            );
            for run in &report.runs {
                print_run_pretty(run);
            }
            println!();
            println!(
                "  migrated: {} | skipped: {} | failed: {} | files copied: {} | files kept: {}",
                report.migrated.to_string().green(),
                report.skipped,
                colour_failed(report.failed),
                report.files_copied,
                report.files_kept
            );
        }
        Format::Minimal => {
            for run in &report.runs {
                println!(
                    "{:>6} {:8} {:>3} {} -> {}",
                    run.run_id,
                    status_label(run.status),
                    run.copied.len(),
                    run.old_dir,
                    run.new_dir
                );
            }
        }
    }
    Ok(())
}

fn print_run_pretty(run: &RunReport) {
    let label = match run.status {
        RunStatus::Failed => status_label(run.status).red().bold(),
        RunStatus::Planned => status_label(run.status).yellow(),
        _ => status_label(run.status).green(),
    };
    println!(
        "  [{}] run {} ({} #{}, experiment {})",
        label, run.run_id, run.detector_muid, run.detector_id, run.experiment_id
    );
    println!("    {} -> {}", run.old_dir, run.new_dir);
    if !run.copied.is_empty() {
        println!("    copied: {}", run.copied.join(", "));
    }
    if !run.kept.is_empty() {
        println!("    kept: {}", run.kept.join(", "));
    }
    if let Some(ref error) = run.error {
        println!("    {}", error.red());
    }
}

fn colour_failed(failed: usize) -> colored::ColoredString {
    if failed == 0 {
        failed.to_string().normal()
    } else {
        failed.to_string().red().bold()
    }
}

pub fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Migrated => "migrated",
        RunStatus::Planned => "planned",
        RunStatus::SourceMissing => "skipped",
        RunStatus::Failed => "failed",
    }
}
