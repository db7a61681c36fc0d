use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "epub-fixer")]
#[command(version)]
#[command(about = "Repair paragraph text and image orientation inside an EPUB", long_about = None)]
#[command(after_help = "Examples:\n  \
  epub-fixer book.epub                     writes book_fixed.epub, extracts into book_extracted/\n  \
  epub-fixer book.epub -o out.epub -w tmp  choose output file and working directory\n  \
  epub-fixer book.epub --orientation exif  use the standard EXIF rotation table")]
pub struct Cli {
    /// EPUB file to repair
    #[arg(value_name = "EPUB")]
    pub input: Option<String>,

    /// Repaired EPUB to write (default: <name>_fixed.epub)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<String>,

    /// Extraction directory, left on disk after the run (default: <name>_extracted)
    #[arg(short = 'w', long = "work-dir", value_name = "DIR")]
    pub work_dir: Option<String>,

    /// Remove an existing working directory before extracting
    #[arg(long)]
    pub clean: bool,

    /// EXIF rotation table: "legacy" or "exif"
    #[arg(long, value_name = "CONVENTION")]
    pub orientation: Option<String>,

    /// Write a JSON summary of per-file outcomes
    #[arg(long, value_name = "FILE")]
    pub report: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}
