//! Edit pipeline: sequences overlay, conversion and HTML transforms for a
//! stored document, writes the result back and advances its status.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::{info, warn};

use crate::command::{EditCommand, EditOutcome};
use crate::convert::{Converter, TargetFormat};
use crate::error::{Result, SignflowError};
use crate::html::{wrap_for_conversion, wrap_for_editing};
use crate::operations::{EditRequest, SignatureRequest, TextBlock};
use crate::overlay::OverlayEngine;
use crate::storage::{Document, DocumentStatus, StorageLayout};

const EDITED_HTML_NAME: &str = "edited.html";

pub struct EditPipeline<'a> {
    overlay: &'a OverlayEngine,
    converter: &'a Converter,
    storage: &'a StorageLayout,
}

impl<'a> EditPipeline<'a> {
    pub fn new(overlay: &'a OverlayEngine, converter: &'a Converter, storage: &'a StorageLayout) -> Self {
        Self {
            overlay,
            converter,
            storage,
        }
    }

    pub fn resolve(&self, document: &Document) -> PathBuf {
        self.storage.resolve(&document.file_path)
    }

    /// Stamp a signature and mark the document signed.
    pub fn sign(&self, document: &mut Document, request: &SignatureRequest) -> Result<usize> {
        let path = self.resolve(document);
        let signed = self.overlay.stamp_signature(
            &path,
            &request.signature_image,
            request.page,
            request.x,
            request.y,
            request.width,
            request.height,
        )?;

        let written = persist(&path, &signed)?;
        document.mark(DocumentStatus::Signed);
        info!("Document {} signed", document.id);
        Ok(written)
    }

    /// Apply structured edits; the document goes back to draft.
    pub fn apply_edits(&self, document: &mut Document, edits: &EditRequest) -> Result<usize> {
        let path = self.resolve(document);
        let edited = self.overlay.apply_edits(&path, edits)?;

        let written = persist(&path, &edited)?;
        document.mark(DocumentStatus::Draft);
        Ok(written)
    }

    /// Insert one free-text run; the document goes back to draft.
    pub fn add_text(&self, document: &mut Document, block: &TextBlock) -> Result<usize> {
        let path = self.resolve(document);
        let edited = self.overlay.add_text(&path, block)?;

        let written = persist(&path, &edited)?;
        document.mark(DocumentStatus::Draft);
        Ok(written)
    }

    /// Convert the stored file to HTML and prepare it for the browser editor.
    pub fn editable_html(&self, document: &Document) -> Result<String> {
        let path = self.resolve(document);
        let work_dir = scratch_dir("signflow-html-")?;

        let html_file = self.converter.to_html(&path, work_dir.path())?;
        let html = String::from_utf8_lossy(&fs::read(&html_file)?).into_owned();
        info!(
            "Converted HTML size: {} bytes from {}",
            html.len(),
            html_file.display()
        );

        Ok(wrap_for_editing(&html))
    }

    /// Render edited HTML to PDF and store it in place of the document.
    pub fn save_html(&self, document: &mut Document, html: &str) -> Result<usize> {
        if html.trim().is_empty() {
            return Err(SignflowError::EmptyContent);
        }

        let path = self.resolve(document);
        let work_dir = scratch_dir("signflow-html-save-")?;
        let html_file = work_dir.path().join(EDITED_HTML_NAME);
        fs::write(&html_file, wrap_for_conversion(html))?;

        let pdf_file = self.converter.to_pdf(&html_file, work_dir.path())?;
        let written = persist(&path, &fs::read(&pdf_file)?)?;
        document.mark(DocumentStatus::Draft);
        info!("Saved edited HTML for document {}", document.id);
        Ok(written)
    }

    /// Converted copy of the stored file. The stored file is not touched.
    pub fn export(&self, document: &Document, format: TargetFormat) -> Result<Vec<u8>> {
        let path = self.resolve(document);
        let work_dir = scratch_dir("signflow-convert-")?;
        let converted = self.converter.convert(&path, work_dir.path(), format)?;
        Ok(fs::read(converted)?)
    }

    /// Stored bytes as they are.
    pub fn download(&self, document: &Document) -> Result<Vec<u8>> {
        let path = self.resolve(document);
        fs::read(&path).map_err(|source| SignflowError::SourceNotFound { path, source })
    }

    pub fn run(&self, document: &mut Document, command: &EditCommand) -> Result<EditOutcome> {
        let started = Instant::now();
        info!("Running {} on document {}", command.name(), document.id);

        let written = match command {
            EditCommand::Sign(request) => self.sign(document, request)?,
            EditCommand::ApplyEdits(edits) => self.apply_edits(document, edits)?,
            EditCommand::SaveHtml { html } => self.save_html(document, html)?,
        };

        Ok(EditOutcome {
            document_id: document.id,
            status: document.status,
            output_size_bytes: written,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Remove the stored file. A missing file is fine and other failures are
    /// only logged.
    pub fn delete_file(&self, document: &Document) {
        let path = self.resolve(document);
        match fs::remove_file(&path) {
            Ok(()) => info!("Deleted {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Error deleting document file {}: {}", path.display(), e),
        }
    }
}

fn scratch_dir(prefix: &str) -> Result<TempDir> {
    Ok(Builder::new().prefix(prefix).tempdir()?)
}

/// Replace `path` with `bytes` through a temporary file in the same directory.
///
/// Symlinks are followed so the link itself survives, and the replaced
/// file's permissions carry over to the new one.
fn persist(path: &Path, bytes: &[u8]) -> Result<usize> {
    let target = match fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e.into()),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    match fs::metadata(&target) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.pdf");
        fs::write(&target, b"old contents").unwrap();

        assert_eq!(persist(&target, b"new").unwrap(), 3);
        assert_eq!(fs::read(&target).unwrap(), b"new");
        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.pdf");
        fs::write(&target, b"old").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

        persist(&target, b"new").unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_writes_through_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.pdf");
        let link = dir.path().join("link.pdf");
        fs::write(&real, b"old").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        persist(&link, b"new").unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&real).unwrap(), b"new");
    }

    #[test]
    fn test_blank_html_is_rejected_before_conversion() {
        let overlay = OverlayEngine::default();
        let converter = Converter::new("/nonexistent/soffice");
        let storage = StorageLayout::new("/nonexistent/uploads");
        let pipeline = EditPipeline::new(&overlay, &converter, &storage);

        let mut doc = Document::new(1, "a.pdf", "a.pdf");
        doc.status = DocumentStatus::Signed;
        let err = pipeline.save_html(&mut doc, " \n\t").unwrap_err();
        assert!(matches!(err, SignflowError::EmptyContent));
        assert_eq!(doc.status, DocumentStatus::Signed);
    }

    #[test]
    fn test_delete_missing_file_is_quiet() {
        let dir = TempDir::new().unwrap();
        let overlay = OverlayEngine::default();
        let converter = Converter::new("soffice");
        let storage = StorageLayout::new(dir.path());
        let pipeline = EditPipeline::new(&overlay, &converter, &storage);

        let doc = Document::new(1, "gone.pdf", "gone.pdf");
        pipeline.delete_file(&doc);

        fs::write(dir.path().join("gone.pdf"), b"x").unwrap();
        pipeline.delete_file(&doc);
        assert!(!dir.path().join("gone.pdf").exists());
    }
}
