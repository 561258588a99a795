//! The scroll-synchronized frame player.
//!
//! [`ScrollReelPlayer`] owns every piece of mutable state: the frame cache, the loader handle,
//! the canvas surface and the per-tick filters. Hosts call [`ScrollReelPlayer::tick`] once per
//! display refresh with the latest viewport and scroll measurements, then apply the returned
//! [`TickReport`] (canvas already updated in place, overlay values to push into the view).

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assets::cache::FrameCache;
use crate::assets::source::FrameSource;
use crate::config::PlayerConfig;
use crate::foundation::core::{FramePosition, Viewport};
use crate::foundation::error::ReelResult;
use crate::lifecycle::{Lifecycle, PlayerPhase};
use crate::loader::{FrameLoader, LoadProgress};
use crate::overlay::{OverlayFrame, OverlayMapper};
use crate::render::renderer::{DrawOutcome, FrameRenderer};
use crate::render::surface::Surface;
use crate::scroll::{ScrollGeometry, ScrollSampler};
use crate::smoothing::ProgressSmoother;
use crate::ticker::CancelToken;

/// Measurements for one animation tick.
#[derive(Clone, Copy, Debug)]
pub struct TickInput {
    pub now: Instant,
    /// Current viewport as measured by the host, jitter included.
    pub viewport: Viewport,
    /// Document scroll offset, CSS pixels.
    pub scroll_y: f64,
    pub geometry: ScrollGeometry,
}

/// What one tick did.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub phase: PlayerPhase,
    /// Drawing geometry was recomputed this tick.
    pub resized: bool,
    pub raw_progress: f64,
    pub smoothed_progress: f64,
    /// Continuous frame position in `[0, N-1]`.
    pub frame_position: f64,
    /// `None` while loading.
    pub draw: Option<DrawOutcome>,
    pub overlays: OverlayFrame,
    pub load: LoadProgress,
}

#[derive(Debug)]
pub struct ScrollReelPlayer {
    reveal_delay: Duration,
    frame_count: u32,
    loader: Option<FrameLoader>,
    render_loop: Option<CancelToken>,
    cache: FrameCache,
    lifecycle: Lifecycle,
    sampler: ScrollSampler,
    smoother: ProgressSmoother,
    renderer: FrameRenderer,
    overlays: OverlayMapper,
    surface: Option<Surface>,
    progress: LoadProgress,
    last_tick: Option<Instant>,
    ticks: u64,
    torn_down: bool,
}

impl ScrollReelPlayer {
    /// Validate `config` and start loading frames from `source`.
    #[tracing::instrument(skip(config, source), fields(frames = config.sequence.frame_count))]
    pub fn mount(
        config: PlayerConfig,
        source: Arc<dyn FrameSource>,
        now: Instant,
    ) -> ReelResult<Self> {
        config.validate()?;

        let PlayerConfig {
            sequence,
            loading,
            viewport,
            smoothing,
            render,
            overlays,
        } = config;
        let frame_count = sequence.frame_count;

        let loader = FrameLoader::spawn(sequence, source, &loading)?;
        tracing::info!(
            initial_batch = loading.initial_batch,
            chunk_size = loading.chunk_size,
            min_quota = loading.min_quota,
            "player mounted"
        );

        Ok(Self {
            reveal_delay: Duration::from_millis(overlays.reveal_delay_ms),
            frame_count,
            progress: loader.progress(),
            loader: Some(loader),
            render_loop: None,
            cache: FrameCache::new(frame_count),
            lifecycle: Lifecycle::new(
                now,
                loading.min_quota,
                Duration::from_millis(loading.timeout_ms),
            ),
            sampler: ScrollSampler::new(viewport),
            smoother: ProgressSmoother::new(smoothing),
            renderer: FrameRenderer::new(render, frame_count),
            overlays: OverlayMapper::new(overlays),
            surface: None,
            last_tick: None,
            ticks: 0,
            torn_down: false,
        })
    }

    pub fn phase(&self) -> PlayerPhase {
        self.lifecycle.phase()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn load_progress(&self) -> LoadProgress {
        self.progress
    }

    /// The canvas. `None` until the first tick has measured a viewport.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn frames(&self) -> &FrameCache {
        &self.cache
    }

    pub fn overlays(&self) -> &OverlayMapper {
        &self.overlays
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Run one animation tick.
    pub fn tick(&mut self, input: TickInput) -> TickReport {
        let tick = self.ticks;
        self.ticks += 1;

        if self.torn_down {
            return TickReport {
                tick,
                phase: self.lifecycle.phase(),
                resized: false,
                raw_progress: 0.0,
                smoothed_progress: self.smoother.value().unwrap_or(0.0),
                frame_position: 0.0,
                draw: None,
                overlays: OverlayFrame::default(),
                load: self.progress,
            };
        }

        self.pump_loader();
        self.lifecycle.update(self.progress, input.now);

        let resized = self.observe_viewport(input.viewport);

        let raw = self.sampler.progress(input.scroll_y, input.geometry);
        let dt = self
            .last_tick
            .map(|t| input.now.saturating_duration_since(t))
            .unwrap_or_default();
        self.last_tick = Some(input.now);
        let reading = self.smoother.update(raw, dt);
        let position = FramePosition::from_progress(reading.smoothed, self.frame_count);

        let draw = match (self.lifecycle.phase(), self.sampler.stable_viewport()) {
            (PlayerPhase::Loading, _) | (_, None) => None,
            (_, Some(viewport)) => self.surface.as_mut().map(|surface| {
                self.renderer
                    .render(position, dt, &self.cache, surface, viewport)
            }),
        };

        let overlays = if self.lifecycle.revealed(input.now, self.reveal_delay) {
            self.overlays.map(reading.smoothed)
        } else {
            OverlayFrame::default()
        };

        TickReport {
            tick,
            phase: self.lifecycle.phase(),
            resized,
            raw_progress: reading.raw,
            smoothed_progress: reading.smoothed,
            frame_position: position.get(),
            draw,
            overlays,
            load: self.progress,
        }
    }

    /// Cancel `handle` on teardown. A torn-down player cancels it immediately.
    pub fn attach_loop(&mut self, handle: CancelToken) {
        if self.torn_down {
            handle.cancel();
            return;
        }
        if let Some(previous) = self.render_loop.replace(handle) {
            previous.cancel();
        }
    }

    /// Block until every frame is resolved or `deadline` passes, then update the lifecycle
    /// at `now` on the host's clock.
    pub fn wait_for_frames(&mut self, deadline: Instant, now: Instant) -> LoadProgress {
        if let Some(loader) = self.loader.as_mut() {
            self.progress = loader.drain_until(&mut self.cache, deadline);
        }
        if !self.torn_down {
            self.lifecycle.update(self.progress, now);
        }
        self.progress
    }

    /// Stop the attached render loop and the loader, then release every decoded frame.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(handle) = self.render_loop.take() {
            handle.cancel();
        }
        if let Some(mut loader) = self.loader.take() {
            loader.cancel();
        }
        let freed_bytes = self.cache.release_all();
        self.surface = None;
        tracing::info!(
            ticks = self.ticks,
            loaded = self.progress.loaded,
            failed = self.progress.failed,
            freed_bytes,
            "player torn down"
        );
    }

    fn pump_loader(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            loader.drain(&mut self.cache);
            self.progress = loader.progress();
        }
    }

    fn observe_viewport(&mut self, measured: Viewport) -> bool {
        if !self.sampler.observe(measured).needs_layout() {
            return false;
        }
        let Some(stable) = self.sampler.stable_viewport() else {
            return false;
        };
        let (width, height) = stable.device_size();
        let resized = match self.surface.as_mut() {
            Some(surface) => surface.resize(width, height),
            None => Surface::new(width, height).map(|s| self.surface = Some(s)),
        };
        if let Err(error) = resized {
            tracing::warn!(width, height, %error, "could not size canvas; drawing disabled");
            self.surface = None;
        }
        self.renderer.invalidate();
        true
    }
}

impl Drop for ScrollReelPlayer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "../tests/unit/player.rs"]
mod tests;
