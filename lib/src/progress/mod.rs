//! Progress reporting and cancellation.
//!
//! Generation has three reportable stages with fixed relative weights:
//! building the collision/avoidance volumes dominates (50 per radius
//! column, split evenly between the two half-passes), dropping and
//! drawing weigh 1 per layer each. The counter is atomic so parallel
//! workers can tick it; the callback invocation is serialized behind a
//! mutex so messages never interleave.

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Weight of one radius column of volume computation.
pub const PROGRESS_WEIGHT_COLLISION: usize = 50;
/// Weight of one dropped layer.
pub const PROGRESS_WEIGHT_DROP: usize = 1;
/// Weight of one drawn layer.
pub const PROGRESS_WEIGHT_DRAW: usize = 1;

/// Stage identifier passed to the callback.
pub const STAGE_SUPPORT: &str = "support";

/// Progress callback: `(stage, done, total)`.
pub type ProgressFn = dyn Fn(&str, usize, usize) + Send + Sync;

/// Weighted progress accumulator for one generation run.
pub struct Progress {
    total: usize,
    done: AtomicUsize,
    callback: Option<Mutex<Box<ProgressFn>>>,
}

impl Progress {
    /// Set up the weighting for `n_samples` radius columns and `n_layers`
    /// layers. `callback` may be `None` for silent runs.
    pub fn new(n_samples: usize, n_layers: usize, callback: Option<Box<ProgressFn>>) -> Self {
        Self {
            total: n_samples * PROGRESS_WEIGHT_COLLISION
                + n_layers * (PROGRESS_WEIGHT_DROP + PROGRESS_WEIGHT_DRAW),
            done: AtomicUsize::new(0),
            callback: callback.map(Mutex::new),
        }
    }

    fn tick(&self, amount: usize) {
        match &self.callback {
            Some(callback) => {
                // Count inside the critical section so reports never
                // regress when workers race.
                let callback = callback.lock().unwrap();
                let done = self.done.fetch_add(amount, Ordering::Relaxed) + amount;
                callback(STAGE_SUPPORT, done.min(self.total), self.total);
            }
            None => {
                self.done.fetch_add(amount, Ordering::Relaxed);
            }
        }
    }

    /// One radius column finished one of its two half-passes
    /// (collision build or avoidance propagation).
    pub fn column_half_done(&self) {
        self.tick(PROGRESS_WEIGHT_COLLISION / 2);
    }

    /// One layer of the drop loop finished.
    pub fn drop_layer_done(&self) {
        self.tick(PROGRESS_WEIGHT_DROP);
    }

    /// One layer of drawCircles finished.
    pub fn draw_layer_done(&self) {
        self.tick(PROGRESS_WEIGHT_DRAW);
    }
}

/// Cooperative cancellation flag.
///
/// Workers check at stage boundaries and at per-layer boundaries inside
/// the drop loop; in-flight geometry operations are not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Error out of the current stage if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
