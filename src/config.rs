use crate::cli::Cli;
use crate::orientation::OrientationConvention;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input_path: String,
    pub output_path: Option<String>,
    pub work_directory: Option<String>,
    pub clean_work_directory: bool,
    pub html_extensions: HashSet<String>,
    pub image_extensions: HashSet<String>,
    pub orientation_convention: OrientationConvention,
    pub report_path: Option<String>,
    pub log_level: String,
}

impl AppConfig {
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("clean_work_directory", false)?
            .set_default("html_extensions", vec!["html"])?
            .set_default("image_extensions", vec!["jpg", "jpeg", "png"])?
            .set_default("orientation_convention", "legacy")?
            .set_default("log_level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .set_override_option("input_path", cli.input.clone())?
            .set_override_option("output_path", cli.output.clone())?
            .set_override_option("work_directory", cli.work_dir.clone())?
            .set_override_option("clean_work_directory", cli.clean.then_some(true))?
            .set_override_option("orientation_convention", cli.orientation.clone())?
            .set_override_option("report_path", cli.report.clone())?
            .set_override_option("log_level", cli.log_level.clone())?
            .build()?;

        s.try_deserialize()
    }

    pub fn input(&self) -> PathBuf {
        PathBuf::from(&self.input_path)
    }

    pub fn output(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => PathBuf::from(path),
            None => self.beside_input("_fixed.epub"),
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        match &self.work_directory {
            Some(path) => PathBuf::from(path),
            None => self.beside_input("_extracted"),
        }
    }

    fn beside_input(&self, suffix: &str) -> PathBuf {
        let input = Path::new(&self.input_path);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "book".to_string());
        input.with_file_name(format!("{}{}", stem, suffix))
    }
}
