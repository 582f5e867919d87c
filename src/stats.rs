//! Streaming statistics used to build normalization parameters.
use serde::{Deserialize, Serialize};

/// Streaming per-feature accumulator of count, mean, and variance
/// (Welford's update). The standard deviation is only meaningful once
/// two or more values have been inserted; callers are expected to fall
/// back to a defined value below that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Aggregation {
    pub fn new() -> Self {
        Aggregation::default()
    }

    pub fn insert(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean; NaN before the first insertion.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// Sample variance; NaN below two insertions.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}
