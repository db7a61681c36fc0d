use crate::error::AppError;
use crate::html::NormalizeStats;
use crate::orientation::Rotation;
use crate::walker::FileKind;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Normalized {
        line_breaks: usize,
        paragraphs: usize,
        pagination_links: usize,
    },
    Rotated {
        degrees: u16,
    },
    /// Re-encoded without rotation.
    Resaved,
    Failed {
        error: String,
    },
}

impl From<NormalizeStats> for FileStatus {
    fn from(stats: NormalizeStats) -> Self {
        FileStatus::Normalized {
            line_breaks: stats.line_breaks,
            paragraphs: stats.paragraphs,
            pagination_links: stats.pagination_links,
        }
    }
}

impl From<Rotation> for FileStatus {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Upright => FileStatus::Resaved,
            rotation => FileStatus::Rotated {
                degrees: rotation.degrees(),
            },
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct FileOutcome {
    /// Path relative to the working directory, `/`-separated.
    pub path: String,
    pub kind: FileKind,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.files.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failure()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.is_failure())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), AppError> {
        let file = std::fs::File::create(path).map_err(|e| AppError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| AppError::io(path, e))
    }
}
