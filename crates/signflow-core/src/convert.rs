//! Driving the external office converter (LibreOffice `soffice`)
//!
//! The converter names its output after the input file, but the extension it
//! picks is not always the one asked for (`html` sometimes comes back as
//! `.htm`). [`ConversionResult`] lists the names to probe, in order.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::{Config, SOFFICE_COMMAND};
use crate::error::{Result, SignflowError};

const PDF_IMPORT_FILTER: &str = "--infilter=writer_pdf_import";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Pdf,
    Html,
    Docx,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Html => "html",
            TargetFormat::Docx => "docx",
        }
    }

    /// Extensions the converter may use for this format, preferred first.
    fn output_extensions(self) -> &'static [&'static str] {
        match self {
            TargetFormat::Pdf => &["pdf"],
            TargetFormat::Html => &["html", "htm"],
            TargetFormat::Docx => &["docx"],
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Pdf),
            "html" | "htm" => Ok(TargetFormat::Html),
            "docx" => Ok(TargetFormat::Docx),
            other => Err(format!("unsupported target format: {}", other)),
        }
    }
}

/// Where a finished conversion may have put its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub format: TargetFormat,
    pub candidate_paths: Vec<PathBuf>,
}

impl ConversionResult {
    pub fn for_input(input: &Path, output_dir: &Path, format: TargetFormat) -> Self {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let candidate_paths = format
            .output_extensions()
            .iter()
            .map(|ext| {
                let mut name = stem.to_os_string();
                name.push(".");
                name.push(ext);
                output_dir.join(name)
            })
            .collect();
        Self {
            format,
            candidate_paths,
        }
    }

    /// First candidate that exists on disk.
    pub fn resolve(&self) -> Result<PathBuf> {
        self.candidate_paths
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or_else(|| SignflowError::OutputNotFound {
                candidates: self.candidate_paths.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    soffice_path: PathBuf,
}

impl Converter {
    pub fn new(soffice_path: impl Into<PathBuf>) -> Self {
        Self {
            soffice_path: soffice_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.soffice_path.clone())
    }

    /// The configured path when it exists, else the bare command name for
    /// `PATH` lookup.
    pub fn program(&self) -> PathBuf {
        if self.soffice_path.is_file() {
            self.soffice_path.clone()
        } else {
            PathBuf::from(SOFFICE_COMMAND)
        }
    }

    /// Arguments passed to the converter, in order.
    pub fn command_args(input: &Path, output_dir: &Path, format: TargetFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--headless".into(), "--nologo".into(), "--nolockcheck".into()];
        if format == TargetFormat::Docx && is_pdf(input) {
            args.push(PDF_IMPORT_FILTER.into());
        }
        args.push("--convert-to".into());
        args.push(format.extension().into());
        args.push("--outdir".into());
        args.push(output_dir.as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());
        args
    }

    /// Convert `input` into `output_dir` and return the produced file.
    ///
    /// Blocks until the converter exits. `output_dir` is created if missing
    /// and never removed.
    pub fn convert(&self, input: &Path, output_dir: &Path, format: TargetFormat) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;

        let program = self.program();
        let args = Self::command_args(input, output_dir, format);
        info!(
            "Converting {} to {} with {}",
            input.display(),
            format,
            program.display()
        );
        debug!("Converter arguments: {:?}", args);

        // stdout and stderr share one file so their lines stay interleaved.
        let mut log = tempfile::tempfile()?;
        let status = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?))
            .status()?;
        let combined = read_log(&mut log)?;

        if !status.success() {
            error!("Conversion of {} failed: {}", input.display(), combined.trim());
            return Err(SignflowError::ConversionFailed {
                status,
                output: combined,
            });
        }
        debug!("Converter output: {}", combined.trim());

        let resolved = ConversionResult::for_input(input, output_dir, format).resolve()?;
        info!("Converted file: {}", resolved.display());
        Ok(resolved)
    }

    pub fn to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.convert(input, output_dir, TargetFormat::Pdf)
    }

    pub fn to_html(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.convert(input, output_dir, TargetFormat::Html)
    }

    pub fn to_docx(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.convert(input, output_dir, TargetFormat::Docx)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn read_log(log: &mut File) -> Result<String> {
    let mut raw = Vec::new();
    log.seek(SeekFrom::Start(0))?;
    log.read_to_end(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
