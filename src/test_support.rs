//! Fixtures shared by the unit tests: in-memory images and zip archives.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Big-endian TIFF block holding a single IFD0 entry: Orientation (SHORT).
fn exif_app1_segment(orientation: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"Exif\0\0");
    payload.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
    payload.extend_from_slice(&1u16.to_be_bytes());
    payload.extend_from_slice(&0x0112u16.to_be_bytes());
    payload.extend_from_slice(&3u16.to_be_bytes());
    payload.extend_from_slice(&1u32.to_be_bytes());
    payload.extend_from_slice(&orientation.to_be_bytes());
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&0u32.to_be_bytes());

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(&payload);
    segment
}

/// A solid JPEG of the given size, with an EXIF orientation tag spliced in
/// right after the SOI marker when `orientation` is set.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: Option<u16>) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 40, 40])));
    tagged_jpeg(&image, orientation)
}

/// Like [`jpeg_with_orientation`], but the left half is red and the right
/// half blue, so the direction of a rotation can be checked.
pub fn two_tone_jpeg(width: u32, height: u32, orientation: Option<u16>) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    });
    tagged_jpeg(&DynamicImage::ImageRgb8(image), orientation)
}

fn tagged_jpeg(image: &DynamicImage, orientation: Option<u16>) -> Vec<u8> {
    let jpeg = encode(image, ImageFormat::Jpeg);
    match orientation {
        Some(value) => {
            let mut tagged = jpeg[..2].to_vec();
            tagged.extend_from_slice(&exif_app1_segment(value));
            tagged.extend_from_slice(&jpeg[2..]);
            tagged
        }
        None => jpeg,
    }
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Every file entry of the archive, keyed by entry name.
pub fn read_zip(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.insert(entry.name().to_string(), contents);
    }
    entries
}

pub fn test_config(input: &Path, work_dir: &Path) -> crate::config::AppConfig {
    crate::config::AppConfig {
        input_path: input.to_string_lossy().into_owned(),
        output_path: None,
        work_directory: Some(work_dir.to_string_lossy().into_owned()),
        clean_work_directory: false,
        html_extensions: ["html"].iter().map(|s| s.to_string()).collect(),
        image_extensions: ["jpg", "jpeg", "png"].iter().map(|s| s.to_string()).collect(),
        orientation_convention: crate::orientation::OrientationConvention::Legacy,
        report_path: None,
        log_level: "debug".to_string(),
    }
}
