use std::io::Cursor;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

use super::*;
use crate::assets::sequence::FrameSequence;
use crate::assets::source::MemoryFrameSource;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::ReelResult;
use crate::loader::LoadingOpts;
use crate::render::renderer::DrawKey;
use crate::ticker::RenderLoop;

fn png(shade: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(2, 2, [shade, shade, shade, 255].repeat(4)).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn memory_source(n: u32) -> MemoryFrameSource {
    let mut src = MemoryFrameSource::new();
    for i in 0..n {
        src.insert(FrameIndex(i), png(i as u8));
    }
    src
}

fn config(n: u32, min_quota: u32) -> PlayerConfig {
    PlayerConfig {
        sequence: FrameSequence {
            frame_count: n,
            extension: "png".to_string(),
            ..FrameSequence::default()
        },
        loading: LoadingOpts {
            min_quota,
            threads: Some(2),
            ..LoadingOpts::default()
        },
        ..PlayerConfig::default()
    }
}

fn viewport(w: f64, h: f64) -> Viewport {
    Viewport::new(w, h, 1.0).unwrap()
}

// 8px viewport over a 108px container: 100px of travel, so scroll_y = progress * 100.
fn input(now: Instant, progress: f64) -> TickInput {
    TickInput {
        now,
        viewport: viewport(8.0, 8.0),
        scroll_y: progress * 100.0,
        geometry: ScrollGeometry {
            top: 0.0,
            height: 108.0,
        },
    }
}

fn loaded_player(n: u32) -> ScrollReelPlayer {
    let mut player =
        ScrollReelPlayer::mount(config(n, 2), Arc::new(memory_source(n)), Instant::now()).unwrap();
    let progress =
        player.wait_for_frames(Instant::now() + Duration::from_secs(10), Instant::now());
    assert!(progress.is_complete());
    player
}

/// Holds every fetch until opened.
struct GatedSource {
    open: Arc<AtomicBool>,
    inner: MemoryFrameSource,
}

impl FrameSource for GatedSource {
    fn fetch(&self, sequence: &FrameSequence, index: FrameIndex) -> ReelResult<Vec<u8>> {
        while !self.open.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.inner.fetch(sequence, index)
    }
}

#[test]
fn loading_player_draws_nothing_until_ready() {
    let open = Arc::new(AtomicBool::new(false));
    let source = GatedSource {
        open: open.clone(),
        inner: memory_source(4),
    };
    let t0 = Instant::now();
    let mut player = ScrollReelPlayer::mount(config(4, 2), Arc::new(source), t0).unwrap();

    let report = player.tick(input(t0, 0.5));
    assert_eq!(report.phase, PlayerPhase::Loading);
    assert_eq!(report.draw, None);
    assert!(report.overlays.is_empty());
    assert!(report.resized);
    assert_eq!(player.surface().map(|s| (s.width(), s.height())), Some((8, 8)));

    open.store(true, Ordering::Release);
    player.wait_for_frames(Instant::now() + Duration::from_secs(10), Instant::now());
    assert_eq!(player.phase(), PlayerPhase::FullyLoaded);

    let report = player.tick(input(t0 + Duration::from_millis(16), 0.5));
    assert!(matches!(report.draw, Some(DrawOutcome::Drawn { .. })));
    assert!(!report.resized);
}

#[test]
fn flick_draws_the_target_frame_directly() {
    let mut player = loaded_player(120);
    let t = Instant::now();

    player.tick(input(t, 0.10));
    let report = player.tick(input(t + Duration::from_millis(16), 0.90));
    assert_eq!(report.smoothed_progress, 0.90);
    assert_eq!(
        report.draw,
        Some(DrawOutcome::Drawn {
            key: DrawKey::Single {
                frame: FrameIndex(107)
            }
        })
    );
    assert_eq!(player.surface().unwrap().pixel(4, 4), Some([107, 107, 107, 255]));
}

#[test]
fn slow_scroll_cross_dissolves_neighbours() {
    let mut player = loaded_player(120);
    let t = Instant::now();

    player.tick(input(t, 0.50));
    let report = player.tick(input(t + Duration::from_millis(16), 0.51));
    // Slow input eases: 59.5 frames moves a fraction of the way toward 60.69.
    assert!(report.smoothed_progress > 0.50 && report.smoothed_progress < 0.51);
    assert!(report.frame_position > 59.5 && report.frame_position < 60.0);
    let Some(DrawOutcome::Drawn {
        key: DrawKey::Blend { base, next, .. },
    }) = report.draw
    else {
        panic!("expected a blend, got {:?}", report.draw);
    };
    assert_eq!((base, next), (FrameIndex(59), FrameIndex(60)));
}

#[test]
fn repeated_identical_input_settles_and_stops_drawing() {
    let mut player = loaded_player(8);
    let t = Instant::now();

    let mut last = None;
    for i in 0..600 {
        last = Some(player.tick(input(t + Duration::from_millis(16 * i), 0.4)));
    }
    let last = last.unwrap();
    assert_eq!(last.smoothed_progress, 0.4);
    assert!(matches!(last.draw, Some(DrawOutcome::Unchanged { .. })));
}

#[test]
fn overlays_publish_only_after_reveal_delay() {
    let mut player = loaded_player(4);
    let t = Instant::now();

    let early = player.tick(input(t + Duration::from_millis(100), 0.0));
    assert!(early.overlays.is_empty());

    let revealed = player.tick(input(t + Duration::from_millis(400), 0.0));
    assert!(!revealed.overlays.is_empty());
    assert!(revealed.overlays.header.is_some());
}

#[test]
fn toolbar_jitter_is_not_a_resize() {
    let mut player = loaded_player(4);
    let t = Instant::now();
    player.tick(input(t, 0.2));

    let mut jitter = input(t + Duration::from_millis(16), 0.2);
    jitter.viewport = viewport(8.0, 64.0);
    let report = player.tick(jitter);
    assert!(!report.resized);
    assert_eq!(report.raw_progress, 0.2);
    assert_eq!(player.surface().unwrap().height(), 8);

    let mut wider = input(t + Duration::from_millis(32), 0.2);
    wider.viewport = viewport(16.0, 8.0);
    let report = player.tick(wider);
    assert!(report.resized);
    assert!(matches!(report.draw, Some(DrawOutcome::Drawn { .. })));
    assert_eq!(player.surface().unwrap().width(), 16);
}

#[test]
fn teardown_releases_frames_and_is_idempotent() {
    let mut player = loaded_player(6);
    player.tick(input(Instant::now(), 0.3));
    assert!(player.frames().retained_bytes() > 0);

    player.teardown();
    assert!(player.is_torn_down());
    assert!(player.frames().is_released());
    assert_eq!(player.frames().loaded(), 0);
    assert!(player.surface().is_none());

    player.teardown();
    let report = player.tick(input(Instant::now(), 0.6));
    assert_eq!(report.draw, None);
    assert!(report.overlays.is_empty());
}

#[test]
fn teardown_stops_the_attached_render_loop() {
    let mut player = loaded_player(4);
    let render_loop = RenderLoop::from_hz(1000.0).unwrap();
    player.attach_loop(render_loop.handle());

    let ran = render_loop.run(|tick| {
        player.tick(input(tick.now, 0.5));
        if tick.index == 2 {
            player.teardown();
        }
        if tick.index >= 9 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(ran, 3);
    assert!(render_loop.handle().is_cancelled());

    // A loop attached after teardown never ticks.
    let late = RenderLoop::from_hz(1000.0).unwrap();
    player.attach_loop(late.handle());
    assert_eq!(late.run(|_| ControlFlow::Continue(())), 0);
}

#[test]
fn waiting_records_readiness_on_the_host_clock() {
    let host_now = Instant::now() + Duration::from_secs(3600);
    let mut player =
        ScrollReelPlayer::mount(config(4, 2), Arc::new(memory_source(4)), host_now).unwrap();
    player.wait_for_frames(Instant::now() + Duration::from_secs(10), host_now);

    assert_eq!(player.phase(), PlayerPhase::FullyLoaded);
    assert_eq!(player.lifecycle().interactive_since(), Some(host_now));

    let early = player.tick(input(host_now + Duration::from_millis(100), 0.0));
    assert!(early.overlays.is_empty());
    let revealed = player.tick(input(host_now + Duration::from_millis(400), 0.0));
    assert!(!revealed.overlays.is_empty());
}
