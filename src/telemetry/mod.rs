pub mod payload;
pub mod receiver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::Label;

/// One inference event as pushed by the serving path. Consumed by a single
/// `track` call and not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub features: Vec<f64>,
    pub prediction: Label,
    #[serde(default)]
    pub actual: Option<Label>,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidPayloadError {
    #[error("request body is not valid JSON: {0}")]
    Body(String),
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field `{field}` must be 0 or 1, got {value}")]
    InvalidLabel { field: &'static str, value: String },
    #[error("`features` has {len} values; tracked feature index {index} is out of range")]
    MissingTrackedFeature { index: usize, len: usize },
}
