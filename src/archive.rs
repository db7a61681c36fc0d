//! Zip container handling: unpacking an EPUB into a working directory and
//! packing a directory tree back into a deflate-compressed archive.

use crate::error::AppError;
use crate::walker::relative_name;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Extracts every entry of `archive_path` below `output_dir`, creating the
/// directory if needed. Returns the number of files written.
///
/// The central directory is read and every entry name is checked before
/// anything touches the disk, so an unreadable input or an escaping entry
/// fails without a partial extraction. If an entry fails to decompress, the
/// files already written by this call are removed again.
pub fn extract_archive(archive_path: &Path, output_dir: &Path) -> Result<usize, AppError> {
    log::debug!("Opening archive {:?}", archive_path);
    let file = File::open(archive_path)
        .map_err(|e| AppError::archive(archive_path, ZipError::Io(e)))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| AppError::archive(archive_path, e))?;

    let entries = plan_extraction(&mut archive, archive_path)?;

    let created_root = !output_dir.exists();
    fs::create_dir_all(output_dir).map_err(|e| AppError::io(output_dir, e))?;

    let mut written = Vec::new();
    match write_entries(&mut archive, archive_path, output_dir, &entries, &mut written) {
        Ok(()) => Ok(written.len()),
        Err(e) => {
            log::warn!(
                "Extraction of {:?} failed, removing {} extracted files",
                archive_path,
                written.len()
            );
            if created_root {
                let _ = fs::remove_dir_all(output_dir);
            } else {
                for path in &written {
                    let _ = fs::remove_file(path);
                }
            }
            Err(e)
        }
    }
}

struct PlannedEntry {
    index: usize,
    relative: PathBuf,
    is_dir: bool,
}

fn plan_extraction(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
) -> Result<Vec<PlannedEntry>, AppError> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| AppError::archive(archive_path, e))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(AppError::UnsafeEntry(entry.name().to_string()));
        };
        entries.push(PlannedEntry {
            index,
            relative,
            is_dir: entry.is_dir(),
        });
    }
    Ok(entries)
}

fn write_entries(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
    output_dir: &Path,
    entries: &[PlannedEntry],
    written: &mut Vec<PathBuf>,
) -> Result<(), AppError> {
    for planned in entries {
        let target = output_dir.join(&planned.relative);
        if planned.is_dir {
            log::trace!("Creating directory {:?}", target);
            fs::create_dir_all(&target).map_err(|e| AppError::io(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }
        let mut entry = archive
            .by_index(planned.index)
            .map_err(|e| AppError::archive(archive_path, e))?;
        log::trace!("Extracting {} -> {:?}", entry.name(), target);
        let mut out = File::create(&target).map_err(|e| AppError::io(&target, e))?;
        written.push(target.clone());
        io::copy(&mut entry, &mut out).map_err(|e| AppError::io(&target, e))?;
    }
    Ok(())
}

/// Writes every regular file under `source_dir` into a new archive at
/// `archive_path`, named by its path relative to `source_dir`. Returns the
/// number of entries written.
pub fn repackage_archive(source_dir: &Path, archive_path: &Path) -> Result<usize, AppError> {
    log::debug!("Creating archive {:?} from {:?}", archive_path, source_dir);
    let file = File::create(archive_path)
        .map_err(|e| AppError::archive(archive_path, ZipError::Io(e)))?;
    // Canonical form of the new archive, to keep it out of its own contents.
    let own_path = fs::canonicalize(archive_path).ok();

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if own_path.is_some() && fs::canonicalize(path).ok() == own_path {
            log::warn!("Skipping the output archive itself: {:?}", path);
            continue;
        }

        let name = relative_name(source_dir, path);
        log::trace!("Adding {:?} as {}", path, name);
        zip.start_file(name, options)
            .map_err(|e| AppError::archive(archive_path, e))?;
        let mut input = File::open(path).map_err(|e| AppError::io(path, e))?;
        io::copy(&mut input, &mut zip)
            .map_err(|e| AppError::archive(archive_path, ZipError::Io(e)))?;
        written += 1;
    }

    zip.finish().map_err(|e| AppError::archive(archive_path, e))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{read_zip, write_zip};
    use tempfile::TempDir;

    const CONTAINER: &[u8] = br#"<?xml version="1.0"?><container/>"#;

    #[test]
    fn test_extract_preserves_nested_paths() {
        let dir = TempDir::new().unwrap();
        let epub = dir.path().join("book.epub");
        write_zip(
            &epub,
            &[
                ("mimetype", b"application/epub+zip"),
                ("META-INF/", b""),
                ("META-INF/container.xml", CONTAINER),
                ("OEBPS/text/deep/ch1.html", b"<p>one</p>"),
            ],
        );
        let out = dir.path().join("not/yet/there");

        let written = extract_archive(&epub, &out).unwrap();

        assert_eq!(written, 3);
        assert_eq!(std::fs::read(out.join("mimetype")).unwrap(), b"application/epub+zip");
        assert_eq!(std::fs::read(out.join("META-INF/container.xml")).unwrap(), CONTAINER);
        assert_eq!(
            std::fs::read(out.join("OEBPS/text/deep/ch1.html")).unwrap(),
            b"<p>one</p>"
        );
    }

    #[test]
    fn test_extract_rejects_non_zip_input_without_writing() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.epub");
        std::fs::write(&bogus, b"this is not a zip archive").unwrap();
        let out = dir.path().join("out");

        let err = extract_archive(&bogus, &out).unwrap_err();

        assert!(matches!(err, AppError::Archive { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_extract_missing_input_is_an_archive_error() {
        let dir = TempDir::new().unwrap();
        let err = extract_archive(&dir.path().join("missing.epub"), dir.path()).unwrap_err();
        assert!(matches!(err, AppError::Archive { .. }));
    }

    #[test]
    fn test_extract_rejects_escaping_entry_names() {
        let dir = TempDir::new().unwrap();
        let epub = dir.path().join("evil.epub");
        write_zip(
            &epub,
            &[("a_good.html", b"<p>ok</p>"), ("../escape.html", b"<p>x</p>")],
        );
        let out = dir.path().join("out");

        let err = extract_archive(&epub, &out).unwrap_err();

        assert!(matches!(err, AppError::UnsafeEntry(_)));
        assert!(!dir.path().join("escape.html").exists());
        // The safe entry listed first was not written either.
        assert!(!out.join("a_good.html").exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_extract_removes_written_files_when_an_entry_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let epub = dir.path().join("damaged.epub");
        let payload = b"SECOND-ENTRY-PAYLOAD";
        let mut zip = ZipWriter::new(File::create(&epub).unwrap());
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("a_good.html", stored).unwrap();
        io::Write::write_all(&mut zip, b"<p>ok</p>").unwrap();
        zip.start_file("b_damaged.html", stored).unwrap();
        io::Write::write_all(&mut zip, payload).unwrap();
        zip.finish().unwrap();

        // Flip one byte of the stored payload so its CRC no longer matches.
        let mut bytes = std::fs::read(&epub).unwrap();
        let at = bytes
            .windows(payload.len())
            .position(|window| window == payload)
            .unwrap();
        bytes[at] ^= 0xFF;
        std::fs::write(&epub, bytes).unwrap();

        let out = dir.path().join("existing");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("keep.txt"), "left alone").unwrap();

        let err = extract_archive(&epub, &out).unwrap_err();

        assert!(matches!(err, AppError::IoFailure { .. }));
        assert!(!out.join("a_good.html").exists());
        assert!(!out.join("b_damaged.html").exists());
        assert_eq!(std::fs::read_to_string(out.join("keep.txt")).unwrap(), "left alone");
    }

    #[test]
    fn test_round_trip_keeps_paths_and_contents() {
        let dir = TempDir::new().unwrap();
        let epub = dir.path().join("book.epub");
        let entries: &[(&str, &[u8])] = &[
            ("mimetype", b"application/epub+zip"),
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", b"<package/>"),
            ("OEBPS/chapter1.html", b"<p>Hello<br/>World</p>"),
            ("OEBPS/images/cover.jpg", &[0xFF, 0xD8, 0xFF, 0xD9]),
        ];
        write_zip(&epub, entries);
        let work = dir.path().join("work");
        let repacked = dir.path().join("repacked.epub");

        extract_archive(&epub, &work).unwrap();
        let written = repackage_archive(&work, &repacked).unwrap();

        assert_eq!(written, entries.len());
        assert_eq!(read_zip(&repacked), read_zip(&epub));
    }

    #[test]
    fn test_repackage_uses_deflate() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(work.join("OEBPS")).unwrap();
        std::fs::write(work.join("OEBPS/ch.html"), "<p>text</p>".repeat(100)).unwrap();
        let out = dir.path().join("out.epub");

        repackage_archive(&work, &out).unwrap();

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let entry = archive.by_name("OEBPS/ch.html").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_repackage_skips_output_inside_source() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join("a.html"), "<p>a</p>").unwrap();
        let out = work.join("z_out.epub");

        let written = repackage_archive(&work, &out).unwrap();

        assert_eq!(written, 1);
        assert_eq!(read_zip(&out).keys().collect::<Vec<_>>(), vec!["a.html"]);
    }

    #[test]
    fn test_repackage_to_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let out = dir.path().join("no/such/dir/out.epub");

        let err = repackage_archive(&work, &out).unwrap_err();
        assert!(matches!(err, AppError::Archive { .. }));
    }
}
