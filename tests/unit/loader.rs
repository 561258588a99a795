use std::io::Cursor;
use std::time::Duration;

use super::*;
use crate::assets::source::MemoryFrameSource;

fn png(shade: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(2, 2, [shade, shade, shade, 255].repeat(4)).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn sequence(n: u32) -> FrameSequence {
    FrameSequence {
        frame_count: n,
        extension: "png".to_string(),
        ..FrameSequence::default()
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(10)
}

#[test]
fn batch_plan_matches_priority_layout() {
    let plan = plan_batches(120, 20, 25);
    assert_eq!(plan.first(), Some(&(0..20)));
    assert_eq!(plan.len(), 1 + 4);
    assert_eq!(plan[1], 20..45);
    assert_eq!(plan.last(), Some(&(95..120)));
    let covered: u32 = plan.iter().map(|r| r.end - r.start).sum();
    assert_eq!(covered, 120);
}

#[test]
fn batch_plan_handles_short_sequences() {
    assert_eq!(plan_batches(5, 20, 25), vec![0..5]);
    assert_eq!(plan_batches(0, 20, 25), Vec::<Range<u32>>::new());
    assert_eq!(plan_batches(3, 0, 0), vec![0..1, 1..2, 2..3]);
}

#[test]
fn percent_counts_failures_as_resolved() {
    let p = LoadProgress {
        total: 120,
        loaded: 15,
        failed: 0,
    };
    assert_eq!(p.percent(), 12);
    let p = LoadProgress {
        total: 3,
        loaded: 1,
        failed: 2,
    };
    assert_eq!(p.percent(), 100);
    assert!(p.is_complete());
}

#[test]
fn loads_every_frame_into_cache() {
    let mut source = MemoryFrameSource::new();
    for i in 0..30 {
        source.insert(FrameIndex(i), png(i as u8));
    }
    let opts = LoadingOpts {
        initial_batch: 4,
        chunk_size: 7,
        threads: Some(2),
        ..LoadingOpts::default()
    };
    let mut loader = FrameLoader::spawn(sequence(30), Arc::new(source), &opts).unwrap();
    let mut cache = FrameCache::new(30);

    let progress = loader.drain_until(&mut cache, deadline());
    assert_eq!(progress.loaded, 30);
    assert_eq!(progress.failed, 0);
    assert_eq!(cache.loaded(), 30);
    assert_eq!(loader.sniffed_decodes(), 0);
    assert_eq!(cache.get(FrameIndex(7)).unwrap().rgba8_premul[0], 7);
}

#[test]
fn failed_frames_are_counted_not_fatal() {
    let mut source = MemoryFrameSource::new();
    for i in 0..10 {
        if i % 3 == 0 {
            source.insert(FrameIndex(i), b"corrupt".to_vec());
        } else if i != 5 {
            source.insert(FrameIndex(i), png(1));
        }
    }
    let mut loader =
        FrameLoader::spawn(sequence(10), Arc::new(source), &LoadingOpts::default()).unwrap();
    let mut cache = FrameCache::new(10);

    let progress = loader.drain_until(&mut cache, deadline());
    // 0,3,6,9 corrupt; 5 missing.
    assert_eq!(progress.failed, 5);
    assert_eq!(progress.loaded, 5);
    assert!(progress.is_complete());
    assert!(!cache.contains(FrameIndex(3)));
    assert!(!cache.contains(FrameIndex(5)));
    assert!(cache.contains(FrameIndex(4)));
}

#[test]
fn sniffed_decodes_are_tracked() {
    let source = MemoryFrameSource::new().with_frame(FrameIndex(0), png(9));
    let seq = FrameSequence {
        frame_count: 1,
        extension: "jpg".to_string(),
        ..FrameSequence::default()
    };
    let mut loader = FrameLoader::spawn(seq, Arc::new(source), &LoadingOpts::default()).unwrap();
    let mut cache = FrameCache::new(1);
    loader.drain_until(&mut cache, deadline());
    assert_eq!(loader.progress().loaded, 1);
    assert_eq!(loader.sniffed_decodes(), 1);
}

#[test]
fn cancelled_loader_publishes_nothing() {
    let mut source = MemoryFrameSource::new();
    for i in 0..8 {
        source.insert(FrameIndex(i), png(2));
    }
    let mut loader =
        FrameLoader::spawn(sequence(8), Arc::new(source), &LoadingOpts::default()).unwrap();
    loader.cancel();
    assert!(loader.is_cancelled());

    std::thread::sleep(Duration::from_millis(50));
    let mut cache = FrameCache::new(8);
    loader.drain(&mut cache);
    assert_eq!(cache.loaded(), 0);
    assert_eq!(loader.progress().resolved(), 0);
}

#[test]
fn spawn_rejects_invalid_options() {
    let opts = LoadingOpts {
        threads: Some(0),
        ..LoadingOpts::default()
    };
    let err = FrameLoader::spawn(sequence(2), Arc::new(MemoryFrameSource::new()), &opts);
    assert!(err.is_err());
}
