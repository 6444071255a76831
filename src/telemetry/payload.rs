use serde_json::Value;

use crate::scoring::Label;
use crate::telemetry::{InvalidPayloadError, Observation};

/// Validates a `/track` body. `features` and `prediction` are required;
/// `actual` may be absent or `null`.
pub fn parse_observation(value: &Value) -> Result<Observation, InvalidPayloadError> {
    let object = value.as_object().ok_or(InvalidPayloadError::NotAnObject)?;

    let features = match object.get("features") {
        None | Some(Value::Null) => return Err(InvalidPayloadError::MissingField("features")),
        Some(Value::Array(items)) => items
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<_>>>()
            .ok_or(InvalidPayloadError::WrongType {
                field: "features",
                expected: "an array of numbers",
            })?,
        Some(_) => {
            return Err(InvalidPayloadError::WrongType {
                field: "features",
                expected: "an array of numbers",
            })
        }
    };

    let prediction = match object.get("prediction") {
        None | Some(Value::Null) => return Err(InvalidPayloadError::MissingField("prediction")),
        Some(raw) => parse_label("prediction", raw)?,
    };

    let actual = match object.get("actual") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(parse_label("actual", raw)?),
    };

    Ok(Observation {
        features,
        prediction,
        actual,
    })
}

fn parse_label(field: &'static str, raw: &Value) -> Result<Label, InvalidPayloadError> {
    match raw {
        Value::Bool(true) => Ok(Label::Positive),
        Value::Bool(false) => Ok(Label::Negative),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Ok(Label::Negative),
            Some(1) => Ok(Label::Positive),
            _ => Err(InvalidPayloadError::InvalidLabel {
                field,
                value: number.to_string(),
            }),
        },
        _ => Err(InvalidPayloadError::WrongType {
            field,
            expected: "0 or 1",
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::scoring::Label;
    use crate::telemetry::payload::parse_observation;
    use crate::telemetry::InvalidPayloadError;

    #[test]
    fn accepts_payload_with_and_without_ground_truth() {
        let labelled = parse_observation(&json!({
            "features": [5000, 20000.5, 1],
            "prediction": 1,
            "actual": 0
        }))
        .expect("valid payload");
        assert_eq!(labelled.features, vec![5000.0, 20000.5, 1.0]);
        assert_eq!(labelled.prediction, Label::Positive);
        assert_eq!(labelled.actual, Some(Label::Negative));

        let unlabelled = parse_observation(&json!({
            "features": [1, 2, 3],
            "prediction": 0,
            "actual": null
        }))
        .expect("valid payload");
        assert_eq!(unlabelled.actual, None);

        let omitted = parse_observation(&json!({"features": [1], "prediction": true}))
            .expect("valid payload");
        assert_eq!(omitted.prediction, Label::Positive);
        assert_eq!(omitted.actual, None);
    }

    #[test]
    fn reports_missing_required_fields() {
        assert_eq!(
            parse_observation(&json!({"features": [1, 2]})),
            Err(InvalidPayloadError::MissingField("prediction"))
        );
        assert_eq!(
            parse_observation(&json!({"prediction": 1})),
            Err(InvalidPayloadError::MissingField("features"))
        );
        assert_eq!(
            parse_observation(&json!([1, 2, 3])),
            Err(InvalidPayloadError::NotAnObject)
        );
    }

    #[test]
    fn rejects_wrong_types_and_labels() {
        assert!(matches!(
            parse_observation(&json!({"features": "1,2", "prediction": 1})),
            Err(InvalidPayloadError::WrongType { field: "features", .. })
        ));
        assert!(matches!(
            parse_observation(&json!({"features": [1, "x"], "prediction": 1})),
            Err(InvalidPayloadError::WrongType { field: "features", .. })
        ));
        assert!(matches!(
            parse_observation(&json!({"features": [1], "prediction": 2})),
            Err(InvalidPayloadError::InvalidLabel { field: "prediction", .. })
        ));
        assert!(matches!(
            parse_observation(&json!({"features": [1], "prediction": 1, "actual": "yes"})),
            Err(InvalidPayloadError::WrongType { field: "actual", .. })
        ));
        assert!(matches!(
            parse_observation(&json!({"features": [1], "prediction": 0.5})),
            Err(InvalidPayloadError::InvalidLabel { field: "prediction", .. })
        ));
    }
}
