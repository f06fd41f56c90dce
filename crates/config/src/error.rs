//! Configuration error types

use thiserror::Error;

use crate::output::TransportType;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while constructing or validating step configuration
///
/// Every invariant of the configuration model is enforced at construction
/// time, so an invalid step config can never reach the router.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "step", "output")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Field present but holding an invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Processor reference must be exactly one of remote-service or in-process
    #[error(
        "processor must set exactly one of grpc_service_name or \
         internal_processor_bean_name ({detail})"
    )]
    ProcessorChoice {
        /// Which way the invariant was violated ("both set" / "neither set")
        detail: &'static str,
    },

    /// Output's transport config does not match its declared transport type
    #[error("output to '{target}' declares transport {transport} but {detail}")]
    TransportMismatch {
        /// Target step of the offending output
        target: String,
        /// Declared transport type
        transport: TransportType,
        /// What is missing or extra
        detail: &'static str,
    },

    /// Kafka input with no topics
    #[error("kafka input must declare at least one topic to listen on")]
    EmptyTopics,

    /// Kafka input with a null/blank topic entry
    #[error("kafka input topic at index {index} is null or blank")]
    BlankTopic {
        /// Position of the offending entry
        index: usize,
    },

    /// Routing output references a step the pipeline does not define
    #[error("pipeline '{pipeline}' step '{step}' output '{output}' targets unknown step '{target}'")]
    UnknownTargetStep {
        /// Pipeline under validation
        pipeline: String,
        /// Step declaring the output
        step: String,
        /// Output name
        output: String,
        /// Missing target step
        target: String,
    },

    /// Two steps registered under the same name
    #[error("pipeline '{pipeline}' already contains step '{step}'")]
    DuplicateStep {
        /// Pipeline under validation
        pipeline: String,
        /// Duplicated step name
        step: String,
    },
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("step", "parser", "step_name");
        assert!(err.to_string().contains("step"));
        assert!(err.to_string().contains("parser"));
        assert!(err.to_string().contains("step_name"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("output", "default", "target_step_name", "is blank");
        assert!(err.to_string().contains("output"));
        assert!(err.to_string().contains("is blank"));
    }

    #[test]
    fn test_processor_choice_error() {
        let err = ConfigError::ProcessorChoice { detail: "both set" };
        assert!(err.to_string().contains("exactly one"));
        assert!(err.to_string().contains("both set"));
    }

    #[test]
    fn test_transport_mismatch_error() {
        let err = ConfigError::TransportMismatch {
            target: "embedder".into(),
            transport: TransportType::Grpc,
            detail: "no grpc config is present",
        };
        assert!(err.to_string().contains("embedder"));
        assert!(err.to_string().contains("grpc"));
    }

    #[test]
    fn test_topic_errors() {
        assert!(
            ConfigError::EmptyTopics
                .to_string()
                .contains("at least one topic")
        );

        let err = ConfigError::BlankTopic { index: 2 };
        assert!(err.to_string().contains("index 2"));
    }
}
