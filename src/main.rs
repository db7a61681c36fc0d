mod archive;
mod cli;
mod config;
mod error;
mod html;
mod orientation;
mod processor;
mod report;
mod walker;

#[cfg(test)]
mod test_support;

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::report::RunReport;
use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::Path;

/// Extracts the book, repairs its HTML and images in the working directory,
/// and packs the result into the output archive. Only archive-level failures
/// abort the run; per-file failures end up in the returned report.
pub fn fix_epub(config: &AppConfig) -> Result<RunReport, AppError> {
    let input = config.input();
    let work_dir = config.work_dir();
    let output = config.output();

    if config.clean_work_directory && work_dir.exists() {
        info!("Removing stale working directory {:?}", work_dir);
        std::fs::remove_dir_all(&work_dir).map_err(|e| AppError::io(&work_dir, e))?;
    }

    let extracted = archive::extract_archive(&input, &work_dir)?;
    info!("Extracted {} files from {:?} into {:?}", extracted, input, work_dir);

    let files = walker::discover_files(&work_dir, config);
    let report = processor::process_files(config, &work_dir, files);

    let written = archive::repackage_archive(&work_dir, &output)?;
    info!("Wrote {} entries to {:?}", written, output);

    Ok(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new(&cli)?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting epub-fixer");

    let report = fix_epub(&config)?;
    for failure in report.failures() {
        log::warn!("Needs manual attention: {}", failure.path);
    }
    if report.is_empty() {
        log::warn!("No HTML or image files found in {}", config.input_path);
    } else {
        info!(
            "{} files processed, {} failed",
            report.len(),
            report.failed_count()
        );
    }

    if let Some(report_path) = &config.report_path {
        if let Err(e) = report.write_json(Path::new(report_path)) {
            log::error!("Could not write run report: {}", e);
        }
    }

    info!("epub-fixer finished");

    Ok(())
}
