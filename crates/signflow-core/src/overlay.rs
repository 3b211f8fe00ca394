//! Overlay engine: stamp signatures, whitewash-and-replace text, draw free
//! text and images on top of existing PDF pages.
//!
//! Every operation loads the whole document into memory, appends new content
//! streams and serializes to a fresh buffer. Nothing is written back to the
//! source path; on error no bytes are produced at all.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::Operation;
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info};

use crate::error::{Result, SignflowError};
use crate::font::{BaseFont, HELVETICA};
use crate::geometry::to_page_space;
use crate::layout::{leading, wrap_text};
use crate::operations::{
    signature_size, EditRequest, ImageBlock, TextBlock, TextReplaceBlock,
};
use crate::page::{add_resource, append_content, page_height, resource_names};
use crate::raster::RasterImage;

const FONT_RESOURCE: &[u8] = b"SfHelv";
const IMAGE_RESOURCE_PREFIX: &str = "SfImg";

/// A client-space box already converted to page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct OverlayEngine {
    font: &'static BaseFont,
}

impl Default for OverlayEngine {
    fn default() -> Self {
        Self::new(&HELVETICA)
    }
}

impl OverlayEngine {
    pub fn new(font: &'static BaseFont) -> Self {
        Self { font }
    }

    pub fn font(&self) -> &'static BaseFont {
        self.font
    }

    /// Draw a signature image on `page` with its top-left corner at client
    /// `(x, y)`. Absent or non-positive sizes fall back to 150x75.
    #[allow(clippy::too_many_arguments)]
    pub fn stamp_signature(
        &self,
        path: &Path,
        image_base64: &str,
        page: u32,
        x: i32,
        y: i32,
        width: Option<i32>,
        height: Option<i32>,
    ) -> Result<Vec<u8>> {
        let mut session = OverlaySession::open(path, self.font)?;
        let (width, height) = signature_size(width, height);
        let image = RasterImage::from_base64(image_base64)?;

        info!(
            "Stamping {}x{} signature on page {} of {}",
            width,
            height,
            page,
            path.display()
        );
        session.draw_image(page, &image, x as f32, y as f32, width, height)?;
        session.finish()
    }

    /// Apply a batch of structured edits.
    ///
    /// Replacements are drawn first, then free text, then images, so a later
    /// whitewash never hides new text and images always end up on top.
    pub fn apply_edits(&self, path: &Path, edits: &EditRequest) -> Result<Vec<u8>> {
        info!(
            "Editing {} with {} text blocks, {} image blocks, {} replace blocks",
            path.display(),
            edits.text_blocks.len(),
            edits.image_blocks.len(),
            edits.replace_blocks.len()
        );

        let mut session = OverlaySession::open(path, self.font)?;

        for block in &edits.replace_blocks {
            session.replace_text(block)?;
        }
        for block in &edits.text_blocks {
            session.draw_free_text(block)?;
        }
        for block in &edits.image_blocks {
            session.draw_image_block(block)?;
        }

        let bytes = session.finish()?;
        info!("Edited PDF size: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Insert one free-text run.
    pub fn add_text(&self, path: &Path, block: &TextBlock) -> Result<Vec<u8>> {
        let mut session = OverlaySession::open(path, self.font)?;
        session.draw_free_text(block)?;
        session.finish()
    }

    /// Concatenate the pages of `paths`, in order, into one document.
    pub fn merge_documents<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<u8>> {
        crate::merge::merge_files(paths)
    }
}

/// Read a source document fully into memory.
pub(crate) fn load_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|source| SignflowError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    Document::load_mem(&bytes).map_err(|e| SignflowError::ParseError(e.to_string()))
}

/// One load/edit/serialize cycle. Operations are collected per page and
/// appended as a single content stream per page on [`finish`](Self::finish).
struct OverlaySession {
    doc: Document,
    font: &'static BaseFont,
    pages: BTreeMap<u32, ObjectId>,
    pending: BTreeMap<ObjectId, Vec<Operation>>,
    font_id: Option<ObjectId>,
    next_image: usize,
}

impl OverlaySession {
    fn open(path: &Path, font: &'static BaseFont) -> Result<Self> {
        let doc = load_document(path)?;
        let pages = doc.get_pages();
        Ok(Self {
            doc,
            font,
            pages,
            pending: BTreeMap::new(),
            font_id: None,
            next_image: 0,
        })
    }

    /// Resolve a 1-based page number to its object id and MediaBox height.
    fn page(&self, page: u32) -> Result<(ObjectId, f32)> {
        let page_id = *self
            .pages
            .get(&page)
            .ok_or(SignflowError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })?;
        Ok((page_id, page_height(&self.doc, page_id)))
    }

    fn ops(&mut self, page_id: ObjectId) -> &mut Vec<Operation> {
        self.pending.entry(page_id).or_default()
    }

    fn ensure_font(&mut self, page_id: ObjectId) -> Result<()> {
        let font_id = match self.font_id {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => self.font.name,
                    "Encoding" => "WinAnsiEncoding",
                });
                self.font_id = Some(id);
                id
            }
        };
        add_resource(&mut self.doc, page_id, b"Font", FONT_RESOURCE, font_id)
    }

    fn replace_text(&mut self, block: &TextReplaceBlock) -> Result<()> {
        let (page_id, page_height) = self.page(block.page)?;
        let font_size = block.font_size();
        let rect = to_page_space(
            block.x as f32,
            block.y as f32,
            block.height as f32,
            page_height,
        );
        let lines = wrap_text(&block.text, block.width as f32, font_size, self.font);
        debug!(
            "Replacing {}x{} region at ({}, {}) on page {} with {} lines",
            block.width,
            block.height,
            block.x,
            block.y,
            block.page,
            lines.len()
        );

        let white = fill_rect_ops(
            PdfRect {
                x: rect.x,
                y: rect.y,
                width: block.width as f32,
                height: block.height as f32,
            },
            (1.0, 1.0, 1.0),
        );
        self.ops(page_id).extend(white);

        let baseline = to_page_space(block.x as f32, block.y as f32, font_size, page_height);
        self.draw_lines(page_id, baseline.x, baseline.y, &lines, font_size)
    }

    fn draw_free_text(&mut self, block: &TextBlock) -> Result<()> {
        let (page_id, page_height) = self.page(block.page)?;
        let baseline = to_page_space(block.x as f32, block.y as f32, 0.0, page_height);
        let lines: Vec<String> = block.text.lines().map(str::to_string).collect();
        debug!(
            "Drawing text at ({}, {}) on page {}",
            block.x, block.y, block.page
        );
        self.draw_lines(page_id, baseline.x, baseline.y, &lines, block.font_size())
    }

    fn draw_lines(
        &mut self,
        page_id: ObjectId,
        x: f32,
        y: f32,
        lines: &[String],
        font_size: f32,
    ) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        self.ensure_font(page_id)?;

        let line_gap = leading(font_size);
        let mut ops = vec![
            Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.to_vec()), Object::Real(font_size)],
            ),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new(
                    "Td",
                    vec![0.into(), Object::Real(-line_gap)],
                ));
            }
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(self.font.encode(line), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));

        self.ops(page_id).extend(ops);
        Ok(())
    }

    fn draw_image_block(&mut self, block: &ImageBlock) -> Result<()> {
        let image = RasterImage::from_base64(&block.data_url)?;
        debug!(
            "Drawing {}x{} image at ({}, {}) on page {}",
            block.width, block.height, block.x, block.y, block.page
        );
        self.draw_image(
            block.page,
            &image,
            block.x as f32,
            block.y as f32,
            block.width as f32,
            block.height as f32,
        )
    }

    fn draw_image(
        &mut self,
        page: u32,
        image: &RasterImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        let (page_id, page_height) = self.page(page)?;
        let origin = to_page_space(x, y, height, page_height);

        let image_id = image.add_to_document(&mut self.doc)?;
        let name = self.unused_image_name(page_id);
        add_resource(&mut self.doc, page_id, b"XObject", name.as_bytes(), image_id)?;

        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width),
                    0.into(),
                    0.into(),
                    Object::Real(height),
                    Object::Real(origin.x),
                    Object::Real(origin.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        self.ops(page_id).extend(ops);
        Ok(())
    }

    fn unused_image_name(&mut self, page_id: ObjectId) -> String {
        let taken = resource_names(&self.doc, page_id, b"XObject");
        loop {
            let name = format!("{}{}", IMAGE_RESOURCE_PREFIX, self.next_image);
            self.next_image += 1;
            if !taken.contains(name.as_bytes()) {
                return name;
            }
        }
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        for (page_id, ops) in std::mem::take(&mut self.pending) {
            append_content(&mut self.doc, page_id, ops)?;
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| SignflowError::OperationError(e.to_string()))?;
        Ok(output)
    }
}

fn fill_rect_ops(rect: PdfRect, (r, g, b): (f32, f32, f32)) -> Vec<Operation> {
    vec![
        Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
        Operation::new(
            "re",
            vec![
                Object::Real(rect.x),
                Object::Real(rect.y),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ],
        ),
        Operation::new("f", vec![]),
    ]
}
