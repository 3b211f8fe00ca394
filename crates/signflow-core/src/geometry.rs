//! Client-space to page-space conversion
//!
//! Clients position overlays with a top-left origin and y growing downward.
//! PDF user space has a bottom-left origin with y growing upward, and every
//! page carries its own height, so conversion happens per primitive.

/// US Letter, used when a page tree carries no usable MediaBox.
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// A point in PDF page space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

/// Convert the client top-left corner `(x, y)` of a drawing `height` tall
/// into the page-space lower-left corner used by `re` and `cm`.
///
/// Text baselines have no height: pass `0.0`.
pub fn to_page_space(x: f32, y: f32, height: f32, page_height: f32) -> PagePoint {
    PagePoint {
        x,
        y: page_height - y - height,
    }
}

/// Inverse of [`to_page_space`]: recover the client top-left corner.
pub fn to_client_space(point: PagePoint, height: f32, page_height: f32) -> (f32, f32) {
    (point.x, page_height - point.y - height)
}
