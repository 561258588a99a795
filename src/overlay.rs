//! Overlay values derived from smoothed progress.
//!
//! Each overlay element owns channels (opacity, translation, scale), each mapped from progress
//! through an [`IntervalMap`]. The mapper only republishes a channel when it moved by at least
//! the channel's threshold, or when it landed exactly on one of its stop values so that fades
//! always finish at 0 or 1.

use crate::foundation::error::{ReelError, ReelResult};

/// Piecewise-linear map from progress stops to output stops, clamped outside the stops.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IntervalMap {
    /// Ascending progress stops.
    pub input: Vec<f64>,
    /// Output value at each stop.
    pub output: Vec<f64>,
}

impl IntervalMap {
    pub fn new(input: Vec<f64>, output: Vec<f64>) -> ReelResult<Self> {
        let map = Self { input, output };
        map.validate()?;
        Ok(map)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.input.len() < 2 || self.input.len() != self.output.len() {
            return Err(ReelError::validation(
                "interval map needs >= 2 stops and equal input/output lengths",
            ));
        }
        if !self.input.iter().chain(&self.output).all(|v| v.is_finite()) {
            return Err(ReelError::validation("interval map stops must be finite"));
        }
        if !self.input.windows(2).all(|w| w[0] <= w[1]) {
            return Err(ReelError::validation(
                "interval map input stops must be ascending",
            ));
        }
        Ok(())
    }

    /// Value at `x`. Stop endpoints return their output exactly.
    pub fn eval(&self, x: f64) -> f64 {
        let (Some(&first_in), Some(&last_in)) = (self.input.first(), self.input.last()) else {
            return 0.0;
        };
        let first_out = self.output.first().copied().unwrap_or(0.0);
        let last_out = self.output.last().copied().unwrap_or(0.0);
        if x.is_nan() || x <= first_in {
            return first_out;
        }
        if x >= last_in {
            return last_out;
        }

        // First stop strictly greater than x; x lies in [input[i-1], input[i]).
        let i = self.input.partition_point(|&s| s <= x);
        let (x0, x1) = (self.input[i - 1], self.input[i]);
        let (y0, y1) = (self.output[i - 1], self.output[i]);
        if x == x0 {
            return y0;
        }
        let t = (x - x0) / (x1 - x0);
        y0 + (y1 - y0) * t
    }

    fn is_stop_value(&self, v: f64) -> bool {
        self.output.contains(&v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayProperty {
    Opacity,
    /// Horizontal offset in CSS pixels.
    TranslateX,
    /// Vertical offset in CSS pixels.
    TranslateY,
    Scale,
}

impl OverlayProperty {
    /// Smallest change worth republishing.
    pub fn default_threshold(self) -> f64 {
        match self {
            Self::Opacity => 0.01,
            Self::TranslateX | Self::TranslateY => 0.5,
            Self::Scale => 0.001,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayChannel {
    pub property: OverlayProperty,
    pub map: IntervalMap,
    /// Overrides [`OverlayProperty::default_threshold`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl OverlayChannel {
    fn new(property: OverlayProperty, input: &[f64], output: &[f64]) -> Self {
        Self {
            property,
            map: IntervalMap {
                input: input.to_vec(),
                output: output.to_vec(),
            },
            threshold: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.property.default_threshold())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayElement {
    pub id: String,
    pub channels: Vec<OverlayChannel>,
}

/// Drives page-header opacity and whether it accepts pointer input.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeaderVisibility {
    pub opacity: IntervalMap,
    /// Opacity at or above which the header takes pointer input.
    pub pointer_threshold: f64,
}

impl Default for HeaderVisibility {
    fn default() -> Self {
        Self {
            opacity: IntervalMap {
                input: vec![0.0, 0.15, 0.85, 1.0],
                output: vec![0.0, 0.0, 0.0, 1.0],
            },
            pointer_threshold: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub elements: Vec<OverlayElement>,
    pub header: Option<HeaderVisibility>,
    /// Delay between becoming interactive and the first overlay publish.
    pub reveal_delay_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        use OverlayProperty::*;

        let fade_in_out = [0.0, 1.0, 1.0, 0.0];
        Self {
            elements: vec![
                OverlayElement {
                    id: "intro".to_string(),
                    channels: vec![
                        OverlayChannel::new(Opacity, &[0.0, 0.12, 0.22], &[1.0, 1.0, 0.0]),
                        OverlayChannel::new(TranslateY, &[0.0, 0.22], &[0.0, -50.0]),
                    ],
                },
                OverlayElement {
                    id: "story1".to_string(),
                    channels: vec![
                        OverlayChannel::new(Opacity, &[0.18, 0.28, 0.42, 0.52], &fade_in_out),
                        OverlayChannel::new(
                            TranslateX,
                            &[0.18, 0.28, 0.42, 0.52],
                            &[-30.0, 0.0, 0.0, -30.0],
                        ),
                    ],
                },
                OverlayElement {
                    id: "story2".to_string(),
                    channels: vec![
                        OverlayChannel::new(Opacity, &[0.48, 0.58, 0.72, 0.82], &fade_in_out),
                        OverlayChannel::new(
                            TranslateX,
                            &[0.48, 0.58, 0.72, 0.82],
                            &[30.0, 0.0, 0.0, 30.0],
                        ),
                    ],
                },
                OverlayElement {
                    id: "cta".to_string(),
                    channels: vec![
                        OverlayChannel::new(Opacity, &[0.78, 0.88, 1.0], &[0.0, 1.0, 1.0]),
                        OverlayChannel::new(Scale, &[0.78, 0.88], &[0.95, 1.0]),
                    ],
                },
            ],
            header: Some(HeaderVisibility::default()),
            reveal_delay_ms: 400,
        }
    }
}

impl OverlayConfig {
    pub fn validate(&self) -> ReelResult<()> {
        let mut ids = std::collections::HashSet::new();
        for el in &self.elements {
            if el.id.is_empty() {
                return Err(ReelError::validation("overlay element id must be non-empty"));
            }
            if !ids.insert(el.id.as_str()) {
                return Err(ReelError::validation(format!(
                    "duplicate overlay element id '{}'",
                    el.id
                )));
            }
            for ch in &el.channels {
                ch.map.validate().map_err(|e| {
                    ReelError::validation(format!("overlay '{}' {:?}: {e}", el.id, ch.property))
                })?;
                if !(ch.threshold().is_finite() && ch.threshold() >= 0.0) {
                    return Err(ReelError::validation(format!(
                        "overlay '{}' threshold must be >= 0",
                        el.id
                    )));
                }
            }
        }
        if let Some(h) = &self.header {
            h.opacity.validate()?;
            if !h.pointer_threshold.is_finite() {
                return Err(ReelError::validation("header pointer_threshold must be finite"));
            }
        }
        Ok(())
    }
}

/// A channel value the view layer should apply.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OverlayUpdate {
    pub element: String,
    pub property: OverlayProperty,
    pub value: f64,
}

/// Header opacity and pointer interactivity.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct HeaderSignal {
    pub opacity: f64,
    pub pointer_events: bool,
}

/// Everything that changed enough to republish this tick.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct OverlayFrame {
    pub updates: Vec<OverlayUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderSignal>,
}

impl OverlayFrame {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.header.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct OverlayMapper {
    config: OverlayConfig,
    published: Vec<Vec<Option<f64>>>,
    header: Option<HeaderSignal>,
}

impl OverlayMapper {
    pub fn new(config: OverlayConfig) -> Self {
        let published = config
            .elements
            .iter()
            .map(|el| vec![None; el.channels.len()])
            .collect();
        Self {
            config,
            published,
            header: None,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Forget published values so the next [`OverlayMapper::map`] republishes everything.
    pub fn reset(&mut self) {
        for el in &mut self.published {
            el.fill(None);
        }
        self.header = None;
    }

    /// Evaluate every channel at `progress`, returning only values worth republishing.
    pub fn map(&mut self, progress: f64) -> OverlayFrame {
        let mut frame = OverlayFrame::default();

        for (el, published) in self.config.elements.iter().zip(&mut self.published) {
            for (ch, last) in el.channels.iter().zip(published.iter_mut()) {
                let value = ch.map.eval(progress);
                if should_publish(*last, value, ch.threshold(), &ch.map) {
                    *last = Some(value);
                    frame.updates.push(OverlayUpdate {
                        element: el.id.clone(),
                        property: ch.property,
                        value,
                    });
                }
            }
        }

        if let Some(cfg) = &self.config.header {
            let opacity = cfg.opacity.eval(progress);
            let signal = HeaderSignal {
                opacity,
                pointer_events: opacity >= cfg.pointer_threshold,
            };
            let changed = match self.header {
                None => true,
                Some(prev) => {
                    prev.pointer_events != signal.pointer_events
                        || should_publish(
                            Some(prev.opacity),
                            opacity,
                            OverlayProperty::Opacity.default_threshold(),
                            &cfg.opacity,
                        )
                }
            };
            if changed {
                self.header = Some(signal);
                frame.header = Some(signal);
            }
        }

        frame
    }

    /// Every channel's value at `progress`, ignoring thresholds and publish state.
    pub fn snapshot(&self, progress: f64) -> Vec<OverlayUpdate> {
        self.config
            .elements
            .iter()
            .flat_map(|el| {
                el.channels.iter().map(move |ch| OverlayUpdate {
                    element: el.id.clone(),
                    property: ch.property,
                    value: ch.map.eval(progress),
                })
            })
            .collect()
    }
}

fn should_publish(last: Option<f64>, value: f64, threshold: f64, map: &IntervalMap) -> bool {
    match last {
        None => true,
        Some(prev) if prev == value => false,
        Some(prev) => (value - prev).abs() >= threshold || map.is_stop_value(value),
    }
}

#[cfg(test)]
#[path = "../tests/unit/overlay.rs"]
mod tests;
