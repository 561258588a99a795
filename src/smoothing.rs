//! Smoothed scroll progress.
//!
//! Two filters are available. [`AdaptiveLerp`] moves a fraction of the remaining distance each
//! tick, with the fraction rising with raw scroll speed: slow scrolling eases, flicks track
//! input. [`SpringOpts`] drives a damped mass-spring toward the raw value. Both clamp their
//! output to `[0, 1]` and snap exactly onto the target once the residual is negligible.

use std::time::Duration;

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::lerp;

/// Adaptive exponential smoothing parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdaptiveLerp {
    /// Per-tick interpolation factor when the input is at rest.
    pub slow_factor: f64,
    /// Per-tick interpolation factor at or above `fast_velocity`.
    pub fast_factor: f64,
    /// Raw input speed, in progress per second, that earns `fast_factor`.
    pub fast_velocity: f64,
    /// Tick rate the factors are tuned for.
    pub reference_hz: f64,
    /// Residual below which the output snaps to the target.
    pub snap_epsilon: f64,
}

impl Default for AdaptiveLerp {
    fn default() -> Self {
        Self {
            slow_factor: 0.08,
            fast_factor: 1.0,
            fast_velocity: 3.0,
            reference_hz: 60.0,
            snap_epsilon: 1e-4,
        }
    }
}

/// Damped spring parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SpringOpts {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    /// Distance from target considered at rest.
    pub rest_delta: f64,
    /// Speed, in progress per second, considered at rest.
    pub rest_speed: f64,
}

impl Default for SpringOpts {
    fn default() -> Self {
        Self {
            stiffness: 40.0,
            damping: 20.0,
            mass: 0.8,
            rest_delta: 1e-5,
            rest_speed: 1e-3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smoothing {
    Adaptive(AdaptiveLerp),
    Spring(SpringOpts),
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::Adaptive(AdaptiveLerp::default())
    }
}

impl Smoothing {
    pub fn validate(&self) -> ReelResult<()> {
        let pos = |v: f64| v.is_finite() && v > 0.0;
        match self {
            Self::Adaptive(a) => {
                let unit = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;
                if !unit(a.slow_factor) || !unit(a.fast_factor) || a.slow_factor > a.fast_factor {
                    return Err(ReelError::validation(
                        "smoothing factors must satisfy 0 < slow_factor <= fast_factor <= 1",
                    ));
                }
                if !pos(a.fast_velocity) || !pos(a.reference_hz) || !pos(a.snap_epsilon) {
                    return Err(ReelError::validation(
                        "fast_velocity, reference_hz and snap_epsilon must be > 0",
                    ));
                }
            }
            Self::Spring(s) => {
                if !pos(s.stiffness) || !pos(s.mass) || !(s.damping.is_finite() && s.damping >= 0.0)
                {
                    return Err(ReelError::validation(
                        "spring needs stiffness > 0, mass > 0 and damping >= 0",
                    ));
                }
                if !pos(s.rest_delta) || !pos(s.rest_speed) {
                    return Err(ReelError::validation("spring rest thresholds must be > 0"));
                }
            }
        }
        Ok(())
    }
}

// Longest step fed to the filters; a stalled host must not fling the spring.
const MAX_DT_SECS: f64 = 0.25;
const SPRING_SUBSTEP_SECS: f64 = 1.0 / 240.0;

/// One smoothed reading.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SmoothedReading {
    pub raw: f64,
    pub smoothed: f64,
    /// Absolute raw input speed, progress per second.
    pub raw_velocity: f64,
}

#[derive(Clone, Debug)]
pub struct ProgressSmoother {
    mode: Smoothing,
    value: Option<f64>,
    spring_velocity: f64,
    last_raw: Option<f64>,
}

impl ProgressSmoother {
    pub fn new(mode: Smoothing) -> Self {
        Self {
            mode,
            value: None,
            spring_velocity: 0.0,
            last_raw: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_settled(&self) -> bool {
        matches!((self.value, self.last_raw), (Some(v), Some(r)) if v == r)
    }

    /// Advance by `dt` toward `raw`.
    ///
    /// The first reading is adopted as-is. A zero `dt` leaves the output unchanged.
    pub fn update(&mut self, raw: f64, dt: Duration) -> SmoothedReading {
        let raw = if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            self.last_raw.unwrap_or(0.0)
        };
        let dt = dt.as_secs_f64().min(MAX_DT_SECS);

        let raw_velocity = match self.last_raw {
            Some(prev) if dt > 0.0 => (raw - prev).abs() / dt,
            _ => 0.0,
        };
        self.last_raw = Some(raw);

        let Some(current) = self.value else {
            self.value = Some(raw);
            return SmoothedReading {
                raw,
                smoothed: raw,
                raw_velocity,
            };
        };

        let next = match &self.mode {
            Smoothing::Adaptive(opts) => step_adaptive(opts, current, raw, raw_velocity, dt),
            Smoothing::Spring(opts) => {
                let (x, v) = step_spring(opts, current, self.spring_velocity, raw, dt);
                self.spring_velocity = v;
                x
            }
        };
        let next = next.clamp(0.0, 1.0);
        self.value = Some(next);

        SmoothedReading {
            raw,
            smoothed: next,
            raw_velocity,
        }
    }

    /// Jump straight to `raw`, discarding any motion.
    pub fn reset_to(&mut self, raw: f64) {
        let raw = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        self.value = Some(raw);
        self.last_raw = Some(raw);
        self.spring_velocity = 0.0;
    }
}

fn step_adaptive(opts: &AdaptiveLerp, current: f64, target: f64, velocity: f64, dt: f64) -> f64 {
    if (target - current).abs() < opts.snap_epsilon {
        return target;
    }
    let speed = (velocity / opts.fast_velocity).clamp(0.0, 1.0);
    let factor = lerp(opts.slow_factor, opts.fast_factor, speed).clamp(0.0, 1.0);
    // Frame-rate independent: `factor` per reference tick.
    let alpha = 1.0 - (1.0 - factor).powf(dt * opts.reference_hz);
    let next = lerp(current, target, alpha);
    if (target - next).abs() < opts.snap_epsilon {
        target
    } else {
        next
    }
}

fn step_spring(opts: &SpringOpts, mut x: f64, mut v: f64, target: f64, dt: f64) -> (f64, f64) {
    let mut remaining = dt;
    while remaining > 0.0 {
        let h = remaining.min(SPRING_SUBSTEP_SECS);
        let force = -opts.stiffness * (x - target) - opts.damping * v;
        v += force / opts.mass * h;
        x += v * h;
        if x <= 0.0 || x >= 1.0 {
            x = x.clamp(0.0, 1.0);
            v = 0.0;
        }
        remaining -= h;
    }
    if (x - target).abs() < opts.rest_delta && v.abs() < opts.rest_speed {
        return (target, 0.0);
    }
    (x, v)
}

#[cfg(test)]
#[path = "../tests/unit/smoothing.rs"]
mod tests;
