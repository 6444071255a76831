use std::sync::Arc;

use crate::baseline::store::BaselineStore;
use crate::baseline::{ColumnRef, DataLoadError};
use crate::drift::ks::{ks_statistic, ks_statistic_sorted, sorted_samples};
use crate::drift::DriftScore;

/// Scores live values of one designated feature against the matching
/// baseline column. The column choice is fixed at construction.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    column: ColumnRef,
    feature_index: usize,
    sorted_reference: Arc<[f64]>,
}

impl DriftDetector {
    pub fn new(
        store: &BaselineStore,
        column: ColumnRef,
        feature_index: usize,
    ) -> Result<Self, DataLoadError> {
        let reference = sorted_samples(store.column(&column)?);
        if reference.is_empty() {
            return Err(DataLoadError::Empty);
        }
        Ok(Self {
            column,
            feature_index,
            sorted_reference: reference.into(),
        })
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    pub fn feature_index(&self) -> usize {
        self.feature_index
    }

    pub fn score(&self, live: &[f64]) -> DriftScore {
        let live = sorted_samples(live);
        DriftScore::new(ks_statistic_sorted(&self.sorted_reference, &live))
    }

    /// Pulls the tracked feature out of a feature vector.
    pub fn tracked_value(&self, features: &[f64]) -> Option<f64> {
        features.get(self.feature_index).copied()
    }
}

pub fn score(baseline_column: &[f64], live_values: &[f64]) -> DriftScore {
    DriftScore::new(ks_statistic(baseline_column, live_values))
}
