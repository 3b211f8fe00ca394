//! Edit requests sent by the client
//!
//! Coordinates are client-space integers (top-left origin) on a 1-based page.
//! Field names follow the browser's camelCase JSON.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT_SIZE: f32 = 14.0;
pub const DEFAULT_SIGNATURE_WIDTH: f32 = 150.0;
pub const DEFAULT_SIGNATURE_HEIGHT: f32 = 75.0;

/// Free text drawn at a baseline position, without wrapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub page: u32,
    pub x: i32,
    pub y: i32,
    pub text: String,
    #[serde(default)]
    pub font_size: Option<f32>,
}

/// Raster image placed in a client-space box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub page: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Base64 payload, optionally prefixed with `data:<type>;base64,`
    pub data_url: String,
}

/// Whitewash a box, then draw wrapped text inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextReplaceBlock {
    pub page: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub text: String,
    #[serde(default)]
    pub font_size: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub signature_image: String,
    pub page: u32,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

/// A batch of structured edits. Missing or `null` lists are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text_blocks: Vec<TextBlock>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_blocks: Vec<ImageBlock>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replace_blocks: Vec<TextReplaceBlock>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TextBlock {
    pub fn font_size(&self) -> f32 {
        self.font_size.unwrap_or(DEFAULT_FONT_SIZE)
    }
}

impl TextReplaceBlock {
    pub fn font_size(&self) -> f32 {
        self.font_size.unwrap_or(DEFAULT_FONT_SIZE)
    }
}

impl SignatureRequest {
    /// Requested size, falling back to 150x75 for absent or non-positive values.
    pub fn size(&self) -> (f32, f32) {
        signature_size(self.width, self.height)
    }
}

pub(crate) fn signature_size(width: Option<i32>, height: Option<i32>) -> (f32, f32) {
    let w = width
        .filter(|w| *w > 0)
        .map_or(DEFAULT_SIGNATURE_WIDTH, |w| w as f32);
    let h = height
        .filter(|h| *h > 0)
        .map_or(DEFAULT_SIGNATURE_HEIGHT, |h| h as f32);
    (w, h)
}

impl EditRequest {
    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty() && self.image_blocks.is_empty() && self.replace_blocks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.text_blocks.len() + self.image_blocks.len() + self.replace_blocks.len()
    }
}
