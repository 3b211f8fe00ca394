//! HTML round trip between the converter and the browser editor

pub mod scanner;
mod transform;

pub use scanner::{Tag, TagScanner};
pub use transform::{
    extract_body, extract_head_styles, repaginate, wrap_for_conversion, wrap_for_editing,
    EXPORT_STYLES, PAGE_OPEN,
};
