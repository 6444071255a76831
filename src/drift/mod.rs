pub mod detector;
pub mod ks;

use serde::{Deserialize, Serialize};

/// Two-sample K-S statistic of the latest tracked batch, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DriftScore(f64);

impl DriftScore {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}
