use std::time::Duration;

use crate::assets::cache::FrameCache;
use crate::foundation::core::{FrameIndex, FramePosition, Rgba8Premul, Size, Viewport};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::unit_to_u8;
use crate::render::composite::draw_frame;
use crate::render::fit::contain_rect;
use crate::render::surface::Surface;

/// Draw-mode thresholds and background color.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOpts {
    /// Position change per reference tick, in frames, at or above which blending is skipped.
    pub single_frame_velocity: f64,
    /// Tick rate `single_frame_velocity` is measured against.
    pub reference_hz: f64,
    /// Blend weights within this distance of 0 or 1 draw the nearer frame alone.
    pub blend_epsilon: f64,
    /// Fill behind the letterboxed frame.
    pub background: Rgba8Premul,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            single_frame_velocity: 2.0,
            reference_hz: 60.0,
            blend_epsilon: 0.01,
            background: Rgba8Premul::opaque_hex(0x0D0D0D),
        }
    }
}

impl RenderOpts {
    pub fn validate(&self) -> ReelResult<()> {
        if !(self.single_frame_velocity.is_finite() && self.single_frame_velocity > 0.0) {
            return Err(ReelError::validation("single_frame_velocity must be > 0"));
        }
        if !(self.reference_hz.is_finite() && self.reference_hz > 0.0) {
            return Err(ReelError::validation("render reference_hz must be > 0"));
        }
        if !(self.blend_epsilon.is_finite() && (0.0..0.5).contains(&self.blend_epsilon)) {
            return Err(ReelError::validation("blend_epsilon must be in [0, 0.5)"));
        }
        Ok(())
    }
}

/// Exactly what a draw put on the surface. Equal keys mean identical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DrawKey {
    Single {
        frame: FrameIndex,
    },
    /// `next` over `base` at `weight / 255`.
    Blend {
        base: FrameIndex,
        next: FrameIndex,
        weight: u8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrawOutcome {
    /// Surface was redrawn.
    Drawn { key: DrawKey },
    /// Surface already shows this; nothing drawn.
    Unchanged { key: DrawKey },
    /// The needed frame is not cached yet; the previous image stays.
    Missing { wanted: FrameIndex },
}

/// Chooses and draws a frame (or a cross-dissolve of two) for a sequence position.
#[derive(Clone, Debug)]
pub struct FrameRenderer {
    opts: RenderOpts,
    frame_count: u32,
    last_drawn: Option<DrawKey>,
    prev_position: Option<f64>,
}

impl FrameRenderer {
    pub fn new(opts: RenderOpts, frame_count: u32) -> Self {
        Self {
            opts,
            frame_count,
            last_drawn: None,
            prev_position: None,
        }
    }

    pub fn last_drawn(&self) -> Option<DrawKey> {
        self.last_drawn
    }

    /// Forget what is on the surface so the next render redraws.
    pub fn invalidate(&mut self) {
        self.last_drawn = None;
    }

    /// Ideal key for `position` given the position change since the last draw, before
    /// considering which frames are loaded.
    ///
    /// Single-frame mode rounds to the nearest frame (halves go up). Blended mode pairs the
    /// floor frame with the next one, weighted by the fractional part.
    pub fn plan(&self, position: FramePosition, velocity: f64) -> DrawKey {
        if velocity >= self.opts.single_frame_velocity {
            return DrawKey::Single {
                frame: position.nearest(),
            };
        }
        let base = position.floor();
        let last = self.frame_count.saturating_sub(1);
        let next = FrameIndex((base.0 + 1).min(last));
        let t = position.fract();
        let eps = self.opts.blend_epsilon;

        if next == base || t < eps {
            DrawKey::Single { frame: base }
        } else if t > 1.0 - eps {
            DrawKey::Single { frame: next }
        } else {
            DrawKey::Blend {
                base,
                next,
                weight: unit_to_u8(t),
            }
        }
    }

    /// Position change since the last render, scaled to frames per reference tick.
    ///
    /// A zero `elapsed` counts the change as one reference tick.
    pub fn velocity(&self, position: FramePosition, elapsed: Duration) -> f64 {
        let Some(prev) = self.prev_position else {
            return 0.0;
        };
        let delta = (position.get() - prev).abs();
        let ticks = elapsed.as_secs_f64() * self.opts.reference_hz;
        if ticks > 0.0 { delta / ticks } else { delta }
    }

    /// Draw `position`, `elapsed` after the previous render.
    pub fn render(
        &mut self,
        position: FramePosition,
        elapsed: Duration,
        cache: &FrameCache,
        surface: &mut Surface,
        viewport: Viewport,
    ) -> DrawOutcome {
        let velocity = self.velocity(position, elapsed);
        self.prev_position = Some(position.get());

        let key = match self.plan(position, velocity) {
            single @ DrawKey::Single { frame } => {
                if !cache.contains(frame) {
                    return DrawOutcome::Missing { wanted: frame };
                }
                single
            }
            blend @ DrawKey::Blend { base, next, .. } => {
                match (cache.contains(base), cache.contains(next)) {
                    (true, true) => blend,
                    (true, false) => DrawKey::Single { frame: base },
                    (false, true) => DrawKey::Single { frame: next },
                    (false, false) => return DrawOutcome::Missing { wanted: base },
                }
            }
        };

        if self.last_drawn == Some(key) {
            return DrawOutcome::Unchanged { key };
        }

        self.draw(key, cache, surface, viewport);
        self.last_drawn = Some(key);
        DrawOutcome::Drawn { key }
    }

    fn draw(&self, key: DrawKey, cache: &FrameCache, surface: &mut Surface, viewport: Viewport) {
        surface.clear(self.opts.background);
        let layers: [(FrameIndex, f32); 2] = match key {
            DrawKey::Single { frame } => [(frame, 1.0), (frame, 0.0)],
            DrawKey::Blend { base, next, weight } => {
                [(base, 1.0), (next, f32::from(weight) / 255.0)]
            }
        };
        for (index, opacity) in layers {
            if opacity <= 0.0 {
                continue;
            }
            let Some(frame) = cache.get(index) else {
                continue;
            };
            let rect = contain_rect(
                Size::new(f64::from(frame.width), f64::from(frame.height)),
                viewport,
            );
            draw_frame(surface, frame, rect, opacity);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
