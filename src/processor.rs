use crate::config::AppConfig;
use crate::error::AppError;
use crate::html;
use crate::orientation;
use crate::report::{FileOutcome, FileStatus, RunReport};
use crate::walker::{relative_name, DiscoveredFile, FileKind};
use std::path::Path;

/// Runs every discovered file through the transform for its kind. A failing
/// file is recorded in the report and never stops the loop.
pub fn process_files(config: &AppConfig, root: &Path, files: Vec<DiscoveredFile>) -> RunReport {
    log::info!("Processing {} content files", files.len());

    let mut report = RunReport::default();
    for file in files {
        log::debug!("Processing {:?} started: {:?}", file.kind, file.path);
        let status = match transform(config, &file) {
            Ok(status) => {
                log::trace!("Outcome for {:?}: {:?}", file.path, status);
                status
            }
            Err(e) => {
                log::warn!("Failed to process {:?}: {}", file.path, e);
                FileStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        report.push(FileOutcome {
            path: relative_name(root, &file.path),
            kind: file.kind,
            status,
        });
    }

    log::info!(
        "All content files processed ({} failed).",
        report.failed_count()
    );
    report
}

fn transform(config: &AppConfig, file: &DiscoveredFile) -> Result<FileStatus, AppError> {
    match file.kind {
        FileKind::Html => html::normalize_html_file(&file.path).map(FileStatus::from),
        FileKind::Image => {
            orientation::fix_image_orientation(&file.path, config.orientation_convention)
                .map(FileStatus::from)
        }
    }
}
