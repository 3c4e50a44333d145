//! Error types for streamql.

use thiserror::Error;

/// Errors raised while building or running a continuous query plan.
#[derive(Error, Debug)]
pub enum StreamqlError {
    #[error("Compile error: {0}")]
    CompileError(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("tuple has input name '{input_name}' set, but we can only deal with {known:?}")]
    UnknownInput {
        input_name: String,
        known: Vec<String>,
    },

    #[error("JOIN not implemented: {0} relation buffers hold data")]
    UnsupportedJoin(usize),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type for streamql operations
pub type StreamqlResult<T> = Result<T, StreamqlError>;

impl serde::Serialize for StreamqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StreamqlError::CompileError("unknown function 'foo'".to_string());
        assert_eq!(err.to_string(), "Compile error: unknown function 'foo'");

        let err = StreamqlError::EvaluationError("division by zero".to_string());
        assert_eq!(err.to_string(), "Evaluation error: division by zero");

        let err = StreamqlError::UnsupportedJoin(2);
        assert_eq!(
            err.to_string(),
            "JOIN not implemented: 2 relation buffers hold data"
        );
    }

    #[test]
    fn test_unknown_input_names_known_relations() {
        let err = StreamqlError::UnknownInput {
            input_name: "clicks".to_string(),
            known: vec!["sensors".to_string(), "events".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'clicks'"));
        assert!(msg.contains("\"sensors\""));
        assert!(msg.contains("\"events\""));
    }

    #[test]
    fn test_serialize_as_string() {
        let err = StreamqlError::TypeError("cannot convert blob to int".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!("Type error: cannot convert blob to int"));
    }
}
