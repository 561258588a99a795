//! Progressive frame loading.
//!
//! A coordinator thread walks the batch plan in order and fans each batch out over a dedicated
//! rayon pool. Workers only fetch and decode; every result travels back over a channel and is
//! published into the [`FrameCache`] by whoever owns the loader, so the cache itself is never
//! shared across threads.

use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Instant;

use rayon::prelude::*;

use crate::assets::cache::{FrameCache, Publish};
use crate::assets::decode::{DecodePath, FrameDecoder, PreparedFrame};
use crate::assets::sequence::FrameSequence;
use crate::assets::source::FrameSource;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::ticker::CancelToken;

/// Batch sizes, readiness quota and timeout for progressive loading.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoadingOpts {
    /// Frames fetched before anything else.
    pub initial_batch: usize,
    /// Size of each follow-up batch.
    pub chunk_size: usize,
    /// Loaded frames needed before the player becomes interactive.
    pub min_quota: u32,
    /// Longest wait for the quota before forcing interactivity.
    pub timeout_ms: u64,
    /// Override loader worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for LoadingOpts {
    fn default() -> Self {
        Self {
            initial_batch: 20,
            chunk_size: 25,
            min_quota: 15,
            timeout_ms: 5_000,
            threads: None,
        }
    }
}

impl LoadingOpts {
    pub fn validate(&self) -> ReelResult<()> {
        if self.initial_batch == 0 || self.chunk_size == 0 {
            return Err(ReelError::validation(
                "initial_batch and chunk_size must be > 0",
            ));
        }
        if self.threads == Some(0) {
            return Err(ReelError::validation("loader threads must be > 0"));
        }
        Ok(())
    }
}

/// Split `0..total` into the initial batch followed by fixed-size chunks.
pub fn plan_batches(total: u32, initial_batch: usize, chunk_size: usize) -> Vec<Range<u32>> {
    let initial = u32::try_from(initial_batch.max(1)).unwrap_or(u32::MAX);
    let chunk = u32::try_from(chunk_size.max(1)).unwrap_or(u32::MAX);

    let mut out = Vec::new();
    let first_end = initial.min(total);
    if first_end > 0 {
        out.push(0..first_end);
    }
    let mut start = first_end;
    while start < total {
        let end = start.saturating_add(chunk).min(total);
        out.push(start..end);
        start = end;
    }
    out
}

/// Result of one fetch-and-decode unit.
#[derive(Debug)]
pub enum LoadEvent {
    /// Frame decoded completely.
    Loaded {
        index: FrameIndex,
        frame: Arc<PreparedFrame>,
        path: DecodePath,
    },
    /// Fetch or decode failed; the frame will stay absent.
    Failed { index: FrameIndex, error: String },
}

/// Aggregate loading counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadProgress {
    pub total: u32,
    pub loaded: u32,
    pub failed: u32,
}

impl LoadProgress {
    /// Frames that reached a final state, successfully or not.
    pub fn resolved(self) -> u32 {
        self.loaded + self.failed
    }

    /// Whole-percent completion over resolved frames, floored.
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((u64::from(self.resolved()) * 100) / u64::from(self.total)).min(100) as u8
    }

    pub fn is_complete(self) -> bool {
        self.resolved() >= self.total
    }
}

/// Owner-side handle of a running load.
#[derive(Debug)]
pub struct FrameLoader {
    events: Receiver<LoadEvent>,
    token: CancelToken,
    resolved: Vec<bool>,
    progress: LoadProgress,
    sniffed: u32,
}

impl FrameLoader {
    /// Start loading every frame of `sequence` in the background.
    pub fn spawn(
        sequence: FrameSequence,
        source: Arc<dyn FrameSource>,
        opts: &LoadingOpts,
    ) -> ReelResult<Self> {
        sequence.validate()?;
        opts.validate()?;

        let pool = build_thread_pool(opts.threads)?;
        let batches = plan_batches(sequence.frame_count, opts.initial_batch, opts.chunk_size);
        let decoder = FrameDecoder::for_extension(&sequence.extension);
        let token = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let total = sequence.frame_count;

        let worker_token = token.clone();
        std::thread::Builder::new()
            .name("scrollreel-loader".to_string())
            .spawn(move || {
                for (n, batch) in batches.into_iter().enumerate() {
                    if worker_token.is_cancelled() {
                        tracing::debug!(batch = n, "loader cancelled before batch");
                        return;
                    }
                    tracing::debug!(
                        batch = n,
                        start = batch.start,
                        end = batch.end,
                        "dispatching frame batch"
                    );
                    pool.install(|| {
                        batch.into_par_iter().for_each(|i| {
                            if worker_token.is_cancelled() {
                                return;
                            }
                            let event =
                                load_one(&sequence, source.as_ref(), &decoder, FrameIndex(i));
                            // Results of a torn-down player are dropped, never published.
                            if worker_token.is_cancelled() {
                                return;
                            }
                            let _ = tx.send(event);
                        });
                    });
                }
            })
            .map_err(|e| ReelError::load(format!("failed to spawn loader thread: {e}")))?;

        Ok(Self {
            events: rx,
            token,
            resolved: vec![false; total as usize],
            progress: LoadProgress {
                total,
                ..LoadProgress::default()
            },
            sniffed: 0,
        })
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }

    /// Frames that needed the content-sniffing decode path.
    pub fn sniffed_decodes(&self) -> u32 {
        self.sniffed
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Mark outstanding work stale. In-flight results are discarded by the workers.
    pub fn cancel(&mut self) {
        if !self.token.is_cancelled() {
            tracing::debug!(
                resolved = self.progress.resolved(),
                total = self.progress.total,
                "cancelling frame loader"
            );
        }
        self.token.cancel();
    }

    /// Publish every completed result without blocking. Returns how many events were applied.
    pub fn drain(&mut self, cache: &mut FrameCache) -> usize {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.apply(event, cache);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.settle_orphans();
                    break;
                }
            }
        }
        applied
    }

    /// Block publishing results until every frame is resolved or `deadline` passes.
    pub fn drain_until(&mut self, cache: &mut FrameCache, deadline: Instant) -> LoadProgress {
        while !self.progress.is_complete() && !self.token.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.events.recv_timeout(deadline - now) {
                Ok(event) => self.apply(event, cache),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.settle_orphans();
                    break;
                }
            }
        }
        self.progress
    }

    fn apply(&mut self, event: LoadEvent, cache: &mut FrameCache) {
        if self.token.is_cancelled() {
            return;
        }
        match event {
            LoadEvent::Loaded { index, frame, path } => {
                if !self.mark_resolved(index) {
                    return;
                }
                match cache.publish(index, frame) {
                    Publish::Stored => {
                        self.progress.loaded += 1;
                        if path == DecodePath::Sniffed {
                            self.sniffed += 1;
                        }
                    }
                    other => {
                        tracing::warn!(
                            index = index.0,
                            outcome = ?other,
                            "decoded frame was not stored"
                        );
                        self.progress.failed += 1;
                    }
                }
            }
            LoadEvent::Failed { index, error } => {
                if !self.mark_resolved(index) {
                    return;
                }
                tracing::warn!(index = index.0, %error, "frame failed to load");
                self.progress.failed += 1;
            }
        }
    }

    fn mark_resolved(&mut self, index: FrameIndex) -> bool {
        match self.resolved.get_mut(index.as_usize()) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        }
    }

    // Workers are gone but some frames never reported: count them as failures so progress
    // still reaches completion.
    fn settle_orphans(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        let mut orphans = 0u32;
        for slot in self.resolved.iter_mut().filter(|r| !**r) {
            *slot = true;
            orphans += 1;
        }
        if orphans > 0 {
            tracing::warn!(orphans, "loader stopped with unresolved frames");
            self.progress.failed += orphans;
        }
    }
}

impl Drop for FrameLoader {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn load_one(
    sequence: &FrameSequence,
    source: &dyn FrameSource,
    decoder: &FrameDecoder,
    index: FrameIndex,
) -> LoadEvent {
    let run = || -> ReelResult<(PreparedFrame, DecodePath)> {
        let bytes = source.fetch(sequence, index)?;
        decoder.decode(&bytes)
    };
    match std::panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok((frame, path))) => LoadEvent::Loaded {
            index,
            frame: Arc::new(frame),
            path,
        },
        Ok(Err(e)) => LoadEvent::Failed {
            index,
            error: e.to_string(),
        },
        Err(_) => LoadEvent::Failed {
            index,
            error: "frame loader panicked".to_string(),
        },
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("scrollreel-decode-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::load(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/loader.rs"]
mod tests;
