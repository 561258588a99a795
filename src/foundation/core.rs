use crate::foundation::error::{ReelError, ReelResult};

pub use kurbo::{Rect, Size};

/// 0-based index into a frame sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    /// Index as a `usize`, for slot addressing.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Continuous position within a sequence, in frames.
///
/// Always lies in `[0, frame_count - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, serde::Serialize)]
pub struct FramePosition(f64);

impl FramePosition {
    /// Map normalized progress onto a sequence of `frame_count` frames.
    ///
    /// Non-finite progress maps to the first frame.
    pub fn from_progress(progress: f64, frame_count: u32) -> Self {
        let last = f64::from(frame_count.saturating_sub(1));
        let p = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self((p * last).clamp(0.0, last))
    }

    /// Raw position in frames.
    pub fn get(self) -> f64 {
        self.0
    }

    /// Nearest frame. Halves round away from zero.
    pub fn nearest(self) -> FrameIndex {
        FrameIndex(self.0.round() as u32)
    }

    /// The frame at or below this position.
    pub fn floor(self) -> FrameIndex {
        FrameIndex(self.0.floor() as u32)
    }

    /// Fractional distance past [`FramePosition::floor`], in `[0, 1)`.
    pub fn fract(self) -> f64 {
        self.0 - self.0.floor()
    }
}

/// Viewport measurement in CSS pixels plus device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
    /// Device pixels per CSS pixel.
    pub dpr: f64,
}

impl Viewport {
    /// Create a validated viewport.
    pub fn new(width: f64, height: f64, dpr: f64) -> ReelResult<Self> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(ReelError::validation(
                "viewport dimensions must be finite and > 0",
            ));
        }
        if !(dpr.is_finite() && dpr > 0.0) {
            return Err(ReelError::validation("device pixel ratio must be > 0"));
        }
        Ok(Self { width, height, dpr })
    }

    /// Size in CSS pixels.
    pub fn css_size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Backing-store size in whole device pixels.
    pub fn device_size(self) -> (u32, u32) {
        let w = (self.width * self.dpr).round().max(1.0) as u32;
        let h = (self.height * self.dpr).round().max(1.0) as u32;
        (w, h)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Opaque color from a `0xRRGGBB` literal.
    pub const fn opaque_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
            a: 255,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Channels in memory order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
