use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ReelError, ReelResult};

/// Premultiplied RGBA8 drawing target, sized in device pixels.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reallocate for new dimensions. Contents are cleared to transparent.
    pub fn resize(&mut self, width: u32, height: u32) -> ReelResult<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        let len = byte_len(width, height)?;
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(len, 0);
        Ok(())
    }

    pub fn clear(&mut self, color: Rgba8Premul) {
        let px = color.to_array();
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Straight-alpha copy suitable for encoding.
    pub fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, out)
            .ok_or_else(|| ReelError::render("surface buffer does not match its dimensions"))
    }
}

fn byte_len(width: u32, height: u32) -> ReelResult<usize> {
    if width == 0 || height == 0 {
        return Err(ReelError::validation("surface dimensions must be > 0"));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| ReelError::validation("surface size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
