use crate::config::AppConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Html,
    Image,
}

impl FileKind {
    /// Classifies by lowercased extension; `None` means the file is left alone.
    pub fn classify(path: &Path, config: &AppConfig) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if config.html_extensions.contains(&ext) {
            Some(FileKind::Html)
        } else if config.image_extensions.contains(&ext) {
            Some(FileKind::Image)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

/// `/`-separated path of `path` below `root`, the form used for archive entries.
pub fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn discover_files(root: &Path, config: &AppConfig) -> Vec<DiscoveredFile> {
    log::info!("Starting file discovery in {:?}", root);
    log::debug!(
        "Configured extensions: html {:?}, image {:?}",
        config.html_extensions,
        config.image_extensions
    );

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
    {
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        let path = entry.path();
        match FileKind::classify(path, config) {
            Some(kind) => {
                log::trace!("Discovered {:?} file: {:?}", kind, path);
                files.push(DiscoveredFile {
                    path: path.to_path_buf(),
                    kind,
                });
            }
            None => log::trace!("Leaving untouched: {:?}", path),
        }
    }

    log::info!("File discovery complete: {} files to process.", files.len());
    files
}
