//! Presentation rotation over a resolved media set
//!
//! Cycles the displayed index `(i + 1) mod N` on a fixed interval. A manual
//! selection restarts the interval. Sets of zero or one image never rotate.
//! State lives for one display session and is not persisted.

use crate::config::RotationConfig;
use crate::error::{ContentError, Result};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Default time between automatic advances
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct Rotation {
    len: usize,
    index: usize,
    interval: Duration,
    /// Start of the current interval
    phase_start: Instant,
}

impl Rotation {
    pub fn new(len: usize, interval: Duration) -> Self {
        Self {
            len,
            index: 0,
            interval,
            phase_start: Instant::now(),
        }
    }

    pub fn with_default_interval(len: usize) -> Self {
        Self::new(len, DEFAULT_INTERVAL)
    }

    pub fn from_config(len: usize, config: &RotationConfig) -> Self {
        Self::new(len, config.interval())
    }

    pub fn current(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a timer runs at all
    pub fn is_rotating(&self) -> bool {
        self.len > 1
    }

    /// Step to the next image, returning the new index.
    pub fn advance(&mut self) -> usize {
        if self.is_rotating() {
            self.index = (self.index + 1) % self.len;
        }
        self.index
    }

    /// Show a specific image and restart the interval.
    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.len {
            return Err(ContentError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.index = index;
        self.phase_start = Instant::now();
        Ok(())
    }

    /// Swap in a new set length (e.g. after a re-resolve); restarts at 0.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.index = 0;
        self.phase_start = Instant::now();
    }

    /// When the next automatic advance is due; `None` when not rotating.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.is_rotating().then(|| self.phase_start + self.interval)
    }

    /// Wait for the next deadline and advance. Pends forever when not
    /// rotating.
    pub async fn tick(&mut self) -> usize {
        let Some(deadline) = self.next_deadline() else {
            return std::future::pending().await;
        };
        sleep_until(deadline).await;
        self.phase_start = Instant::now();
        self.advance()
    }
}
