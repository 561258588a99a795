//! Scrollreel plays a pre-rendered image sequence in step with scroll position.
//!
//! A [`ScrollReelPlayer`] streams frames in the background, turns viewport and scroll
//! measurements into smoothed progress, draws the matching frame (or a cross-dissolve of two
//! neighbours) into a premultiplied RGBA8 [`Surface`], and reports overlay values for the host
//! to apply:
//!
//! - Build a [`PlayerConfig`] (or load one with [`PlayerConfig::from_path`])
//! - [`ScrollReelPlayer::mount`] it over a [`FrameSource`]
//! - Call [`ScrollReelPlayer::tick`] once per display refresh
#![forbid(unsafe_code)]

mod assets;
mod foundation;
mod render;

pub(crate) mod config;
pub(crate) mod lifecycle;
pub(crate) mod loader;
pub(crate) mod overlay;
pub(crate) mod player;
pub(crate) mod scroll;
pub(crate) mod smoothing;
pub(crate) mod ticker;

pub use crate::foundation::core::{FrameIndex, FramePosition, Rect, Rgba8Premul, Size, Viewport};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assets::cache::{FrameCache, Publish};
pub use crate::assets::decode::{DecodePath, FrameDecoder, PreparedFrame};
pub use crate::assets::sequence::FrameSequence;
pub use crate::assets::source::{FrameSource, FsFrameSource, MemoryFrameSource};
pub use crate::config::PlayerConfig;
pub use crate::lifecycle::{Lifecycle, PlayerPhase, ReadyReason};
pub use crate::loader::{FrameLoader, LoadEvent, LoadProgress, LoadingOpts, plan_batches};
pub use crate::overlay::{
    HeaderSignal, HeaderVisibility, IntervalMap, OverlayChannel, OverlayConfig, OverlayElement,
    OverlayFrame, OverlayMapper, OverlayProperty, OverlayUpdate,
};
pub use crate::player::{ScrollReelPlayer, TickInput, TickReport};
pub use crate::render::fit::contain_rect;
pub use crate::render::renderer::{DrawKey, DrawOutcome, FrameRenderer, RenderOpts};
pub use crate::render::surface::Surface;
pub use crate::scroll::{ResizeOutcome, ScrollGeometry, ScrollSampler, ViewportOpts};
pub use crate::smoothing::{
    AdaptiveLerp, ProgressSmoother, SmoothedReading, Smoothing, SpringOpts,
};
pub use crate::ticker::{CancelToken, RenderLoop, Tick};
