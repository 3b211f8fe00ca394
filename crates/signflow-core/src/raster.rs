//! Decoding client-supplied raster images into PDF image XObjects

use std::io::Write;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::{write::ZlibEncoder, Compression};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Result, SignflowError};

/// An image decoded to 8-bit RGB samples with optional 8-bit alpha.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Strip an optional `data:<type>;base64,` header and decode the payload.
pub fn decode_base64_payload(input: &str) -> Result<Vec<u8>> {
    let payload = match input.trim_start().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| SignflowError::InvalidImageData("data URL has no payload".into()))?,
        None => input,
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SignflowError::InvalidImageData("empty image payload".into()));
    }

    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| SignflowError::InvalidImageData(format!("base64: {}", e)))
}

impl RasterImage {
    /// Decode a base64 (or data URL) PNG/JPEG payload.
    pub fn from_base64(input: &str) -> Result<Self> {
        let bytes = decode_base64_payload(input)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| SignflowError::InvalidImageData(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(SignflowError::InvalidImageData(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        let has_alpha = decoded.color().has_alpha();
        let rgba = decoded.to_rgba8();
        let pixel_count = (width as usize) * (height as usize);

        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(if has_alpha { pixel_count } else { 0 });
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            if has_alpha {
                alpha.push(pixel.0[3]);
            }
        }

        // Fully opaque alpha channels are dropped so no soft mask is written.
        let alpha = if has_alpha && alpha.iter().any(|a| *a != u8::MAX) {
            Some(alpha)
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            rgb,
            alpha,
        })
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Add this image to `doc` as an `/XObject /Image`, with a DeviceGray
    /// `/SMask` carrying transparency when present.
    pub fn add_to_document(&self, doc: &mut Document) -> Result<ObjectId> {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(self.width as i64),
            "Height" => Object::Integer(self.height as i64),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "FlateDecode",
        };

        if let Some(alpha) = &self.alpha {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(self.width as i64),
                "Height" => Object::Integer(self.height as i64),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "FlateDecode",
            };
            let mask_id = doc.add_object(flate_stream(mask_dict, alpha)?);
            image_dict.set("SMask", Object::Reference(mask_id));
        }

        Ok(doc.add_object(flate_stream(image_dict, &self.rgb)?))
    }
}

fn flate_stream(dict: lopdf::Dictionary, samples: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    let compressed = encoder.finish()?;

    let mut stream = Stream::new(dict, compressed);
    stream.allows_compression = false;
    Ok(stream)
}
