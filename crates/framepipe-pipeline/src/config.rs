//! Pipeline tuning.

use framepipe_core::backlog::{HIGH_WATER_FACTOR, LOW_WATER_FACTOR};
use framepipe_core::{FramePipeError, Result};
use serde::{Deserialize, Serialize};

/// Which reader a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Many requests in flight ahead of the reader, reordered on arrival.
    Pipelined,
    /// One request per read, concurrency capped by a counting gate.
    Bounded,
}

/// Configuration for a frame reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Requests kept in flight ahead of the reader. `None` uses the source's
    /// concurrency degree. A resolved window of 1 selects bounded-synchronous
    /// reads.
    pub prefetch_window: Option<usize>,
    /// Throttle producers when the backlog exceeds window × this factor.
    pub high_water_factor: usize,
    /// Throttled producers resume at window × this factor.
    pub low_water_factor: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefetch_window: None,
            high_water_factor: HIGH_WATER_FACTOR,
            low_water_factor: LOW_WATER_FACTOR,
        }
    }
}

impl PipelineConfig {
    /// Bounded-synchronous configuration.
    pub fn synchronous() -> Self {
        Self {
            prefetch_window: Some(1),
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.prefetch_window = Some(window);
        self
    }

    pub fn with_water_factors(mut self, high: usize, low: usize) -> Self {
        self.high_water_factor = high;
        self.low_water_factor = low;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefetch_window == Some(0) {
            return Err(FramePipeError::InvalidParameter(
                "prefetch window must be at least 1".to_string(),
            ));
        }
        if self.high_water_factor == 0 || self.low_water_factor == 0 {
            return Err(FramePipeError::InvalidParameter(
                "water-mark factors must be at least 1".to_string(),
            ));
        }
        if self.low_water_factor > self.high_water_factor {
            return Err(FramePipeError::InvalidParameter(format!(
                "low-water factor {} exceeds high-water factor {}",
                self.low_water_factor, self.high_water_factor
            )));
        }
        Ok(())
    }

    /// Reader for a source offering `concurrency` workers. A window of one,
    /// configured or inherited from the source, reads synchronously.
    pub fn mode_for(&self, concurrency: usize) -> ReadMode {
        match self.window_for(concurrency) {
            1 => ReadMode::Bounded,
            _ => ReadMode::Pipelined,
        }
    }

    /// Requests kept in flight for a source offering `concurrency` workers.
    pub fn window_for(&self, concurrency: usize) -> usize {
        self.prefetch_window.unwrap_or(concurrency).max(1)
    }

    /// `(high, low)` backlog thresholds for a window.
    pub fn water_marks(&self, window: usize) -> (usize, usize) {
        (
            window * self.high_water_factor,
            window * self.low_water_factor,
        )
    }
}
