use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error on {path:?}: {source}")]
    IoFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Archive error on {path:?}: {source}")]
    Archive {
        path: PathBuf,
        source: ZipError,
    },

    #[error("Archive entry escapes the extraction directory: {0}")]
    UnsafeEntry(String),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unrecognized image format: {0:?}")]
    UnsupportedImage(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::IoFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn archive(path: impl AsRef<Path>, source: ZipError) -> Self {
        AppError::Archive {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
