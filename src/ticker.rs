//! Cooperatively scheduled repeating task with an explicit cancellation handle.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::error::{ReelError, ReelResult};

/// Shared liveness flag. Cloning shares the flag; cancelling is permanent.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_live(&self) -> bool {
        !self.is_cancelled()
    }
}

/// One invocation of the loop body.
#[derive(Clone, Copy, Debug)]
pub struct Tick {
    /// 0-based tick counter.
    pub index: u64,
    /// When the tick started.
    pub now: Instant,
    /// Time since the previous tick; zero on the first.
    pub dt: Duration,
}

/// Fixed-interval loop standing in for a display refresh callback.
///
/// The body runs on the calling thread. The loop ends when the body breaks or when any clone
/// of [`RenderLoop::handle`] is cancelled; a cancelled loop never calls the body again.
#[derive(Debug)]
pub struct RenderLoop {
    interval: Duration,
    token: CancelToken,
}

impl RenderLoop {
    pub fn new(interval: Duration) -> ReelResult<Self> {
        if interval.is_zero() {
            return Err(ReelError::validation("render loop interval must be > 0"));
        }
        Ok(Self {
            interval,
            token: CancelToken::new(),
        })
    }

    pub fn from_hz(hz: f64) -> ReelResult<Self> {
        if !(hz.is_finite() && hz > 0.0) {
            return Err(ReelError::validation("render loop rate must be > 0"));
        }
        Self::new(Duration::from_secs_f64(1.0 / hz))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle that stops the loop before its next tick.
    pub fn handle(&self) -> CancelToken {
        self.token.clone()
    }

    /// Run until cancelled or until the body breaks. Returns the number of ticks run.
    pub fn run<F>(&self, mut body: F) -> u64
    where
        F: FnMut(Tick) -> ControlFlow<()>,
    {
        let mut ticks = 0u64;
        let mut prev: Option<Instant> = None;
        let mut deadline = Instant::now();

        while self.token.is_live() {
            let now = Instant::now();
            if now < deadline {
                std::thread::sleep(deadline - now);
                continue;
            }

            let dt = prev.map(|p| now.saturating_duration_since(p)).unwrap_or_default();
            prev = Some(now);
            let flow = body(Tick {
                index: ticks,
                now,
                dt,
            });
            ticks += 1;
            if flow.is_break() {
                break;
            }

            deadline += self.interval;
            // Fell behind by more than a tick: resync rather than burst.
            if deadline + self.interval < Instant::now() {
                deadline = Instant::now() + self.interval;
            }
        }
        ticks
    }
}

#[cfg(test)]
#[path = "../tests/unit/ticker.rs"]
mod tests;
