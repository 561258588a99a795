use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Decoded frame in premultiplied RGBA8 form, ready to draw.
#[derive(Clone, Debug)]
pub struct PreparedFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedFrame {
    /// Wrap an already-premultiplied buffer.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> ReelResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| ReelError::decode("frame size overflow"))?;
        if width == 0 || height == 0 || rgba8_premul.len() != expected {
            return Err(ReelError::decode(format!(
                "frame buffer must be {width}x{height}x4 bytes (got {})",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Bytes held by the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.rgba8_premul.len()
    }
}

/// Which decode path produced a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum DecodePath {
    /// Format taken from the sequence's file extension.
    Hinted,
    /// Format sniffed from the content.
    Sniffed,
}

/// Decodes frame bytes, preferring the extension-hinted codec and falling back to content
/// sniffing when the hinted codec is unavailable in this build or rejects the bytes.
#[derive(Clone, Copy, Debug)]
pub struct FrameDecoder {
    hinted: Option<image::ImageFormat>,
}

impl FrameDecoder {
    /// Probe codec support for `extension` once, up front.
    pub fn for_extension(extension: &str) -> Self {
        let hinted = image::ImageFormat::from_extension(extension).filter(|f| f.reading_enabled());
        if hinted.is_none() {
            tracing::debug!(extension, "no hinted decoder; frames will be sniffed");
        }
        Self { hinted }
    }

    pub fn has_hinted_path(&self) -> bool {
        self.hinted.is_some()
    }

    pub fn decode(&self, bytes: &[u8]) -> ReelResult<(PreparedFrame, DecodePath)> {
        if let Some(format) = self.hinted {
            match image::load_from_memory_with_format(bytes, format) {
                Ok(img) => return Ok((prepare(img)?, DecodePath::Hinted)),
                Err(e) => {
                    tracing::debug!(?format, error = %e, "hinted decode failed; sniffing");
                }
            }
        }
        let img = sniff_decode(bytes)?;
        Ok((prepare(img)?, DecodePath::Sniffed))
    }
}

fn sniff_decode(bytes: &[u8]) -> ReelResult<image::DynamicImage> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("sniff frame format")?;
    if reader.format().is_none() {
        return Err(ReelError::decode("unrecognized frame format"));
    }
    reader
        .decode()
        .map_err(|e| ReelError::decode(format!("decode frame: {e}")))
}

fn prepare(img: image::DynamicImage) -> ReelResult<PreparedFrame> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    PreparedFrame::from_premul(width, height, rgba8_premul)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
