use std::time::{Duration, Instant};

use crate::loader::LoadProgress;

/// Player lifecycle. Only `Loading` blocks rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPhase {
    Loading,
    Interactive,
    /// Every frame resolved; loading is over.
    FullyLoaded,
}

/// Why the player left `Loading`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyReason {
    Quota,
    Timeout,
    /// Every frame resolved before the quota or timeout was hit.
    AllResolved,
}

#[derive(Clone, Debug)]
pub struct Lifecycle {
    phase: PlayerPhase,
    mounted_at: Instant,
    min_quota: u32,
    timeout: Duration,
    interactive_at: Option<Instant>,
    reason: Option<ReadyReason>,
}

impl Lifecycle {
    pub fn new(mounted_at: Instant, min_quota: u32, timeout: Duration) -> Self {
        Self {
            phase: PlayerPhase::Loading,
            mounted_at,
            min_quota,
            timeout,
            interactive_at: None,
            reason: None,
        }
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn ready_reason(&self) -> Option<ReadyReason> {
        self.reason
    }

    pub fn interactive_since(&self) -> Option<Instant> {
        self.interactive_at
    }

    /// True once `delay` has passed since becoming interactive.
    pub fn revealed(&self, now: Instant, delay: Duration) -> bool {
        self.interactive_at
            .is_some_and(|at| now.saturating_duration_since(at) >= delay)
    }

    /// Advance on fresh loader counters. Returns the new phase if it changed.
    pub fn update(&mut self, progress: LoadProgress, now: Instant) -> Option<PlayerPhase> {
        let before = self.phase;

        if self.phase == PlayerPhase::Loading {
            let reason = if progress.loaded >= self.min_quota {
                Some(ReadyReason::Quota)
            } else if progress.is_complete() {
                Some(ReadyReason::AllResolved)
            } else if now.saturating_duration_since(self.mounted_at) >= self.timeout {
                Some(ReadyReason::Timeout)
            } else {
                None
            };
            if let Some(reason) = reason {
                self.phase = PlayerPhase::Interactive;
                self.interactive_at = Some(now);
                self.reason = Some(reason);
                let waited_ms = now.saturating_duration_since(self.mounted_at).as_millis() as u64;
                match reason {
                    ReadyReason::Timeout => tracing::info!(
                        loaded = progress.loaded,
                        failed = progress.failed,
                        quota = self.min_quota,
                        waited_ms,
                        "frame quota not met in time; player interactive anyway"
                    ),
                    _ => tracing::info!(
                        loaded = progress.loaded,
                        failed = progress.failed,
                        ?reason,
                        waited_ms,
                        "player interactive"
                    ),
                }
            }
        }

        if self.phase == PlayerPhase::Interactive && progress.is_complete() {
            self.phase = PlayerPhase::FullyLoaded;
            tracing::info!(
                loaded = progress.loaded,
                failed = progress.failed,
                "all frames resolved"
            );
        }

        (self.phase != before).then_some(self.phase)
    }
}

#[cfg(test)]
#[path = "../tests/unit/lifecycle.rs"]
mod tests;
