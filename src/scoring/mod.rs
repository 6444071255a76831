pub mod scorer;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Binary class label as carried by predictions and ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(value: Label) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Negative),
            1 => Ok(Self::Positive),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    TruePositive,
    FalsePositive,
    TrueNegative,
    FalseNegative,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::TruePositive,
        Outcome::FalsePositive,
        Outcome::TrueNegative,
        Outcome::FalseNegative,
    ];

    pub fn classify(predicted: Label, actual: Label) -> Self {
        match (predicted, actual) {
            (Label::Positive, Label::Positive) => Self::TruePositive,
            (Label::Positive, Label::Negative) => Self::FalsePositive,
            (Label::Negative, Label::Negative) => Self::TrueNegative,
            (Label::Negative, Label::Positive) => Self::FalseNegative,
        }
    }

    pub fn as_slug(self) -> &'static str {
        match self {
            Self::TruePositive => "tp",
            Self::FalsePositive => "fp",
            Self::TrueNegative => "tn",
            Self::FalseNegative => "fn",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    #[serde(rename = "tp")]
    pub true_positives: u64,
    #[serde(rename = "fp")]
    pub false_positives: u64,
    #[serde(rename = "tn")]
    pub true_negatives: u64,
    #[serde(rename = "fn")]
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    pub fn increment(&mut self, outcome: Outcome) {
        let cell = match outcome {
            Outcome::TruePositive => &mut self.true_positives,
            Outcome::FalsePositive => &mut self.false_positives,
            Outcome::TrueNegative => &mut self.true_negatives,
            Outcome::FalseNegative => &mut self.false_negatives,
        };
        *cell = cell.saturating_add(1);
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::TruePositive => self.true_positives,
            Outcome::FalsePositive => self.false_positives,
            Outcome::TrueNegative => self.true_negatives,
            Outcome::FalseNegative => self.false_negatives,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Consistent view of the scorer after one update: the derived metrics are
/// always computed from exactly the counters reported alongside them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub confusion: ConfusionMatrix,
    pub predictions: u64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl MetricSnapshot {
    pub fn from_counts(confusion: ConfusionMatrix, predictions: u64) -> Self {
        Self {
            confusion,
            predictions,
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
        }
    }
}
