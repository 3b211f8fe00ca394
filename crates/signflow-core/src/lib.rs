//! Document rendering and edit pipeline
//!
//! - [`OverlayEngine`]: signatures, replacement text, free text and images
//!   drawn over existing PDF pages with lopdf, plus page-wise merge
//! - [`Converter`]: drives LibreOffice between PDF, HTML and DOCX
//! - [`html`]: turns converter HTML into editable markup and back
//! - [`EditPipeline`]: runs the above against a stored [`Document`]

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod font;
pub mod geometry;
pub mod html;
pub mod layout;
pub mod merge;
pub mod operations;
pub mod overlay;
pub mod page;
pub mod pipeline;
pub mod raster;
pub mod storage;

pub use command::{EditCommand, EditOutcome};
pub use config::Config;
pub use convert::{ConversionResult, Converter, TargetFormat};
pub use error::{Result, SignflowError};
pub use font::{BaseFont, HELVETICA};
pub use geometry::{to_client_space, to_page_space, PagePoint};
pub use layout::wrap_text;
pub use merge::{merge_documents, merge_files};
pub use operations::{EditRequest, ImageBlock, SignatureRequest, TextBlock, TextReplaceBlock};
pub use overlay::OverlayEngine;
pub use pipeline::EditPipeline;
pub use storage::{Document, DocumentStatus, StorageLayout};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| SignflowError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
