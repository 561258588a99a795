//! Scroll progress sampling.
//!
//! Progress is measured against a *stable* viewport: height changes smaller than
//! [`ViewportOpts::height_jitter_px`] (mobile toolbars sliding in and out) are absorbed, so the
//! same absolute scroll offset always yields the same progress. Width changes, DPR changes and
//! large height changes count as genuine resizes.

use crate::foundation::core::Viewport;
use crate::foundation::error::{ReelError, ReelResult};

/// Resize detection thresholds, in CSS pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewportOpts {
    /// Width change that counts as a resize.
    pub width_threshold_px: f64,
    /// Height change at or below this is treated as toolbar jitter.
    pub height_jitter_px: f64,
    /// Container height as a multiple of viewport height, in percent. Used by hosts that derive
    /// the container geometry instead of measuring it.
    pub container_height_vh: f64,
}

impl Default for ViewportOpts {
    fn default() -> Self {
        Self {
            width_threshold_px: 1.0,
            height_jitter_px: 120.0,
            container_height_vh: 400.0,
        }
    }
}

impl ViewportOpts {
    pub fn validate(&self) -> ReelResult<()> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        if !ok(self.width_threshold_px) || !ok(self.height_jitter_px) {
            return Err(ReelError::validation(
                "viewport thresholds must be finite and >= 0",
            ));
        }
        if !(self.container_height_vh.is_finite() && self.container_height_vh >= 100.0) {
            return Err(ReelError::validation("container_height_vh must be >= 100"));
        }
        Ok(())
    }
}

/// Container placement in document coordinates, CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScrollGeometry {
    /// Document offset of the container's top edge.
    pub top: f64,
    /// Full container height.
    pub height: f64,
}

impl ScrollGeometry {
    /// Container `vh_percent` viewport-heights tall, starting at `top`.
    pub fn from_viewport_multiple(top: f64, vh_percent: f64, viewport_height: f64) -> Self {
        Self {
            top,
            height: viewport_height * vh_percent / 100.0,
        }
    }

    /// Document scroll offset at which progress equals `progress`.
    pub fn scroll_offset_for(self, progress: f64, viewport_height: f64) -> f64 {
        let travel = (self.height - viewport_height).max(0.0);
        self.top + progress.clamp(0.0, 1.0) * travel
    }
}

/// What an observed viewport measurement meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum ResizeOutcome {
    /// First measurement.
    Initial,
    /// No change, or jitter below the thresholds.
    Unchanged,
    /// Dimensions changed past a threshold; drawing geometry must be recomputed.
    Resized,
}

impl ResizeOutcome {
    pub fn needs_layout(self) -> bool {
        matches!(self, Self::Initial | Self::Resized)
    }
}

#[derive(Clone, Debug)]
pub struct ScrollSampler {
    opts: ViewportOpts,
    stable: Option<Viewport>,
}

impl ScrollSampler {
    pub fn new(opts: ViewportOpts) -> Self {
        Self { opts, stable: None }
    }

    /// Viewport used for layout and progress.
    pub fn stable_viewport(&self) -> Option<Viewport> {
        self.stable
    }

    pub fn observe(&mut self, measured: Viewport) -> ResizeOutcome {
        let Some(stable) = self.stable else {
            self.stable = Some(measured);
            return ResizeOutcome::Initial;
        };

        let dw = (measured.width - stable.width).abs();
        let dh = (measured.height - stable.height).abs();
        let dpr_changed = (measured.dpr - stable.dpr).abs() > f64::EPSILON;

        if dpr_changed || dw > self.opts.width_threshold_px || dh > self.opts.height_jitter_px {
            tracing::debug!(
                from_w = stable.width,
                from_h = stable.height,
                to_w = measured.width,
                to_h = measured.height,
                dpr = measured.dpr,
                "viewport resized"
            );
            self.stable = Some(measured);
            ResizeOutcome::Resized
        } else {
            ResizeOutcome::Unchanged
        }
    }

    /// Fraction of the container's scrollable travel covered at `scroll_y`, in `[0, 1]`.
    ///
    /// A container no taller than the viewport has no travel; it reads 0 before its top and 1
    /// from its top onward. Before any viewport has been observed this reads 0.
    pub fn progress(&self, scroll_y: f64, geometry: ScrollGeometry) -> f64 {
        let Some(stable) = self.stable else {
            return 0.0;
        };
        let travel = geometry.height - stable.height;
        let offset = scroll_y - geometry.top;
        if !offset.is_finite() {
            return 0.0;
        }
        if !(travel.is_finite() && travel > 0.0) {
            return if offset >= 0.0 { 1.0 } else { 0.0 };
        }
        (offset / travel).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
#[path = "../tests/unit/scroll.rs"]
mod tests;
