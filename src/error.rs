use thiserror::Error;

/// Canonical result for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed view, axis, condition or domain definition.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Field {0} not found")]
    FieldNotFound(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unsupported timerange: {0}")]
    UnsupportedTimerange(String),

    #[error("Unsupported units: {0}")]
    UnsupportedUnit(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Malformed value for field '{field}': {value}")]
    MalformedValue { field: String, value: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Runtime failure inside the expression interpreter.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(field: &str, value: &serde_json::Value) -> Self {
        Error::MalformedValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_definition_errors() {
        assert_eq!(
            Error::FieldNotFound("unknown_field".into()).to_string(),
            "Field unknown_field not found"
        );
        assert_eq!(
            Error::UnsupportedTimerange("decade".into()).to_string(),
            "Unsupported timerange: decade"
        );
    }

    #[test]
    fn test_malformed_renders_json_value() {
        let err = Error::malformed("consum", &serde_json::json!("abc"));
        assert_eq!(err.to_string(), "Malformed value for field 'consum': \"abc\"");
    }
}
