use std::sync::{Mutex, MutexGuard};

use crate::scoring::{ConfusionMatrix, Label, MetricSnapshot, Outcome};

#[derive(Debug, Default)]
struct ScorerState {
    confusion: ConfusionMatrix,
    predictions: u64,
}

/// Lifetime-cumulative confusion matrix shared by every `track` call.
///
/// Each `record` applies its counter increment and recomputes precision,
/// recall and F1 under one lock, so no reader can see counters from one call
/// paired with derived metrics from another.
#[derive(Debug, Default)]
pub struct ClassificationScorer {
    state: Mutex<ScorerState>,
}

impl ClassificationScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, predicted: Label, actual: Option<Label>) -> MetricSnapshot {
        self.record_with(predicted, actual, |_, _| {})
    }

    /// Like [`record`](Self::record), but runs `publish` while the update is
    /// still held so exported values land in the same order as the updates.
    /// `publish` receives the outcome that was counted, if any.
    pub fn record_with<F>(
        &self,
        predicted: Label,
        actual: Option<Label>,
        publish: F,
    ) -> MetricSnapshot
    where
        F: FnOnce(Option<Outcome>, &MetricSnapshot),
    {
        let mut state = self.lock();
        state.predictions = state.predictions.saturating_add(1);
        let outcome = actual.map(|actual| Outcome::classify(predicted, actual));
        if let Some(outcome) = outcome {
            state.confusion.increment(outcome);
        }
        let snapshot = MetricSnapshot::from_counts(state.confusion, state.predictions);
        publish(outcome, &snapshot);
        snapshot
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        let state = self.lock();
        MetricSnapshot::from_counts(state.confusion, state.predictions)
    }

    fn lock(&self) -> MutexGuard<'_, ScorerState> {
        // Updates never panic midway, so a poisoned guard still holds whole counts.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::scoring::scorer::ClassificationScorer;
    use crate::scoring::{ConfusionMatrix, Label, Outcome};

    fn label(bit: bool) -> Label {
        if bit {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    #[test]
    fn one_of_each_outcome_gives_half_everywhere() {
        let scorer = ClassificationScorer::new();
        scorer.record(Label::Positive, Some(Label::Positive));
        scorer.record(Label::Positive, Some(Label::Negative));
        scorer.record(Label::Negative, Some(Label::Negative));
        let snapshot = scorer.record(Label::Negative, Some(Label::Positive));

        assert_eq!(
            snapshot.confusion,
            ConfusionMatrix {
                true_positives: 1,
                false_positives: 1,
                true_negatives: 1,
                false_negatives: 1,
            }
        );
        assert_eq!(snapshot.precision, 0.5);
        assert_eq!(snapshot.recall, 0.5);
        assert_eq!(snapshot.f1, 0.5);
        assert_eq!(snapshot.predictions, 4);
    }

    #[test]
    fn absent_ground_truth_only_counts_volume() {
        let scorer = ClassificationScorer::new();
        scorer.record(Label::Positive, Some(Label::Positive));
        let before = scorer.snapshot();
        let after = scorer.record(Label::Negative, None);
        assert_eq!(after.confusion, before.confusion);
        assert_eq!(after.precision, before.precision);
        assert_eq!(after.predictions, before.predictions + 1);
    }

    #[test]
    fn publish_sees_counted_outcome() {
        let scorer = ClassificationScorer::new();
        let mut seen = None;
        scorer.record_with(Label::Negative, Some(Label::Positive), |outcome, snapshot| {
            seen = Some((outcome, snapshot.confusion.false_negatives));
        });
        assert_eq!(seen, Some((Some(Outcome::FalseNegative), 1)));

        scorer.record_with(Label::Negative, None, |outcome, _| seen = Some((outcome, 0)));
        assert_eq!(seen, Some((None, 0)));
    }

    #[test]
    fn cumulative_metrics_dilute_an_old_shift() {
        let scorer = ClassificationScorer::new();
        for _ in 0..90 {
            scorer.record(Label::Positive, Some(Label::Positive));
        }
        for _ in 0..10 {
            scorer.record(Label::Positive, Some(Label::Negative));
        }
        let degraded = scorer.snapshot().precision;
        for _ in 0..900 {
            scorer.record(Label::Positive, Some(Label::Positive));
        }
        let recovered = scorer.snapshot().precision;
        assert!((degraded - 0.9).abs() < 1e-12);
        assert!(recovered > degraded && recovered < 1.0);
    }

    #[test]
    fn concurrent_records_lose_no_updates() {
        let scorer = Arc::new(ClassificationScorer::new());
        let threads = 8;
        let per_thread = 500;
        let handles = (0..threads)
            .map(|t| {
                let scorer = Arc::clone(&scorer);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let predicted = label((i + t) % 2 == 0);
                        let actual = label(i % 3 == 0);
                        let snapshot = scorer.record(predicted, Some(actual));
                        let expected = snapshot.confusion;
                        assert_eq!(snapshot.precision, expected.precision());
                        assert_eq!(snapshot.f1, expected.f1());
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("scorer thread panicked");
        }
        let snapshot = scorer.snapshot();
        assert_eq!(snapshot.confusion.total(), (threads * per_thread) as u64);
        assert_eq!(snapshot.predictions, (threads * per_thread) as u64);
    }

    proptest! {
        #[test]
        fn derived_metrics_depend_only_on_totals(
            calls in prop::collection::vec((any::<bool>(), prop::option::of(any::<bool>())), 0..300),
        ) {
            let forward = ClassificationScorer::new();
            let backward = ClassificationScorer::new();
            for (predicted, actual) in &calls {
                forward.record(label(*predicted), actual.map(label));
            }
            for (predicted, actual) in calls.iter().rev() {
                backward.record(label(*predicted), actual.map(label));
            }

            let snapshot = forward.snapshot();
            prop_assert_eq!(snapshot, backward.snapshot());

            let labelled = calls.iter().filter(|(_, actual)| actual.is_some()).count() as u64;
            prop_assert_eq!(snapshot.confusion.total(), labelled);
            prop_assert_eq!(snapshot.predictions, calls.len() as u64);

            let tp = snapshot.confusion.count(Outcome::TruePositive) as f64;
            let fp = snapshot.confusion.count(Outcome::FalsePositive) as f64;
            let expected_precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
            prop_assert_eq!(snapshot.precision, expected_precision);
        }
    }
}
