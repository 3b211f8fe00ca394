//! Edit pipeline against stored files, with a fake converter where needed

mod common;

use std::fs;

use lopdf::content::Content;
use pretty_assertions::assert_eq;
use signflow_core::{
    Converter, Document, DocumentStatus, EditCommand, EditPipeline, EditRequest, OverlayEngine,
    SignatureRequest, SignflowError, StorageLayout, TextBlock, TextReplaceBlock,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    overlay: OverlayEngine,
    converter: Converter,
    storage: StorageLayout,
}

impl Fixture {
    fn new(soffice: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("uploads");
        fs::create_dir_all(uploads.join("user-1")).unwrap();

        #[cfg(unix)]
        let converter = match soffice {
            Some(body) => Converter::new(common::write_script(dir.path(), "soffice", body)),
            None => Converter::new(dir.path().join("missing-soffice")),
        };
        #[cfg(not(unix))]
        let converter = {
            let _ = soffice;
            Converter::new(dir.path().join("missing-soffice"))
        };

        Self {
            overlay: OverlayEngine::default(),
            converter,
            storage: StorageLayout::new(uploads),
            _dir: dir,
        }
    }

    fn pipeline(&self) -> EditPipeline<'_> {
        EditPipeline::new(&self.overlay, &self.converter, &self.storage)
    }

    fn store(&self, relative: &str, bytes: &[u8]) -> Document {
        fs::write(self.storage.upload_dir().join(relative), bytes).unwrap();
        Document::new(1, relative.rsplit('/').next().unwrap(), relative)
    }
}

#[test]
fn test_sign_rewrites_file_and_marks_signed() {
    let fx = Fixture::new(None);
    let mut doc = fx.store("user-1/contract.pdf", &common::create_test_pdf(2, "Contract"));
    let request = SignatureRequest {
        signature_image: common::png_data_url(40, 20, [0, 0, 120, 200]),
        page: 2,
        x: 100,
        y: 100,
        width: None,
        height: None,
    };

    let outcome = fx
        .pipeline()
        .run(&mut doc, &EditCommand::Sign(request))
        .unwrap();

    assert_eq!(outcome.status, DocumentStatus::Signed);
    assert_eq!(doc.status, DocumentStatus::Signed);

    let stored = fs::read(fx.pipeline().resolve(&doc)).unwrap();
    assert_eq!(stored.len(), outcome.output_size_bytes);

    let pdf = lopdf::Document::load_mem(&stored).unwrap();
    let page = pdf.get_pages()[&2];
    let ops = Content::decode(&pdf.get_page_content(page).unwrap())
        .unwrap()
        .operations;
    assert!(ops.iter().any(|o| o.operator == "Do"));
}

#[test]
fn test_failed_edit_leaves_file_and_status() {
    let fx = Fixture::new(None);
    let original = common::create_test_pdf(1, "Keep");
    let mut doc = fx.store("user-1/keep.pdf", &original);
    doc.status = DocumentStatus::Signed;

    let edits = EditRequest {
        replace_blocks: vec![TextReplaceBlock {
            page: 4,
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            text: "x".into(),
            font_size: None,
        }],
        ..Default::default()
    };
    let err = fx.pipeline().apply_edits(&mut doc, &edits).unwrap_err();

    assert!(matches!(err, SignflowError::PageOutOfRange { page: 4, page_count: 1 }));
    assert_eq!(doc.status, DocumentStatus::Signed);
    assert_eq!(fs::read(fx.pipeline().resolve(&doc)).unwrap(), original);
}

#[test]
fn test_apply_edits_returns_to_draft() {
    let fx = Fixture::new(None);
    let mut doc = fx.store("user-1/form.pdf", &common::create_test_pdf(1, "Form"));
    doc.status = DocumentStatus::Signed;

    let edits: EditRequest = serde_json::from_str(
        r#"{"replaceBlocks":[{"page":1,"x":50,"y":50,"width":200,"height":30,"text":"New value"}]}"#,
    )
    .unwrap();
    fx.pipeline().apply_edits(&mut doc, &edits).unwrap();

    assert_eq!(doc.status, DocumentStatus::Draft);
    let stored = fs::read(fx.pipeline().resolve(&doc)).unwrap();
    let pdf = lopdf::Document::load_mem(&stored).unwrap();
    let page = pdf.get_pages()[&1];
    let text = String::from_utf8_lossy(&pdf.get_page_content(page).unwrap()).into_owned();
    assert!(text.contains("Form-Page-1"));
    assert!(text.contains("(New value) Tj"));
}

#[test]
fn test_add_text_keeps_page_count() {
    let fx = Fixture::new(None);
    let mut doc = fx.store("user-1/note.pdf", &common::create_test_pdf(3, "Note"));
    let block = TextBlock {
        page: 3,
        x: 72,
        y: 72,
        text: "Approved".into(),
        font_size: Some(12.0),
    };
    fx.pipeline().add_text(&mut doc, &block).unwrap();

    let stored = fx.pipeline().download(&doc).unwrap();
    assert_eq!(signflow_core::get_page_count(&stored).unwrap(), 3);
    assert_eq!(doc.status, DocumentStatus::Draft);
}

#[test]
fn test_download_missing_file() {
    let fx = Fixture::new(None);
    let doc = Document::new(9, "gone.pdf", "user-1/gone.pdf");
    let err = fx.pipeline().download(&doc).unwrap_err();
    assert!(matches!(err, SignflowError::SourceNotFound { .. }));
}

#[cfg(unix)]
mod with_converter {
    use super::*;
    use pretty_assertions::assert_eq;
    use signflow_core::html::EXPORT_STYLES;
    use signflow_core::TargetFormat;
    use std::sync::Mutex;

    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn test_editable_html_is_paginated() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let fx = Fixture::new(Some(common::FAKE_SOFFICE));
        let doc = fx.store("user-1/offer.pdf", &common::create_test_pdf(1, "Offer"));

        let html = fx.pipeline().editable_html(&doc).unwrap();
        assert_eq!(
            html,
            concat!(
                "<style>p{margin:0}</style>",
                r#"<div class="page"><p>offer</p>"#,
                r#"</div><div class="page"><p style="page-break-before:always">second</p></div>"#,
            )
        );
    }

    #[test]
    fn test_save_html_stores_converted_document() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let fx = Fixture::new(Some(common::FAKE_SOFFICE));
        let mut doc = fx.store("user-1/offer.pdf", &common::create_test_pdf(1, "Offer"));
        doc.status = DocumentStatus::Signed;

        let command = EditCommand::SaveHtml {
            html: r#"<div class="page"><p>Edited offer</p></div>"#.to_string(),
        };
        let outcome = fx.pipeline().run(&mut doc, &command).unwrap();
        assert_eq!(outcome.status, DocumentStatus::Draft);

        // The fake converter copies its input, so the stored file is the
        // wrapped HTML that was sent for conversion.
        let stored = fs::read_to_string(fx.pipeline().resolve(&doc)).unwrap();
        assert!(stored.starts_with("<!DOCTYPE html>"));
        assert!(stored.contains(EXPORT_STYLES));
        assert!(stored.contains("<p>Edited offer</p>"));
    }

    #[test]
    fn test_export_leaves_stored_file_alone() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let fx = Fixture::new(Some(common::FAKE_SOFFICE));
        let original = common::create_test_pdf(1, "Export");
        let doc = fx.store("user-1/export.pdf", &original);

        let docx = fx.pipeline().export(&doc, TargetFormat::Docx).unwrap();
        assert_eq!(docx, original);
        assert_eq!(fs::read(fx.pipeline().resolve(&doc)).unwrap(), original);
    }

    #[test]
    fn test_conversion_failure_keeps_document() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let fx = Fixture::new(Some(common::FAILING_SOFFICE));
        let original = common::create_test_pdf(1, "Fail");
        let mut doc = fx.store("user-1/fail.pdf", &original);
        doc.status = DocumentStatus::Completed;

        let err = fx.pipeline().save_html(&mut doc, "<p>x</p>").unwrap_err();
        assert!(matches!(err, SignflowError::ConversionFailed { .. }));
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(fs::read(fx.pipeline().resolve(&doc)).unwrap(), original);
    }
}
