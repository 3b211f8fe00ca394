use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignflowError {
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: usize },

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("Source not found: {}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion failed ({status}): {output}")]
    ConversionFailed { status: ExitStatus, output: String },

    #[error("Converted file not found, tried: {}", display_paths(candidates))]
    OutputNotFound { candidates: Vec<PathBuf> },

    #[error("HTML content is empty")]
    EmptyContent,

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SignflowError>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
