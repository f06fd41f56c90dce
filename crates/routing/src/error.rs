//! Routing error types

use thiserror::Error;

use pipework_config::TransportType;
use pipework_transport::TransportError;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors surfaced by the router
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No handler registered for a transport type
    #[error("no transport handler registered for {transport}")]
    NoHandler {
        /// The unhandled transport
        transport: TransportType,
    },

    /// The matched handler cannot route the given step
    #[error("{transport} handler cannot handle step '{step}'")]
    HandlerRejected {
        /// Rejected step
        step: String,
        /// Handler's transport
        transport: TransportType,
    },

    /// Delivery failed inside the transport handler
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The step's overall deadline elapsed before an attempt succeeded
    #[error("step '{step}' timed out after {timeout_ms}ms including retries")]
    StepTimeout {
        /// Step that timed out
        step: String,
        /// Configured step timeout
        timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_handler_error() {
        let err = RoutingError::NoHandler {
            transport: TransportType::Kafka,
        };
        assert!(err.to_string().contains("kafka"));
        assert!(err.to_string().contains("no transport handler"));
    }

    #[test]
    fn test_handler_rejected_error() {
        let err = RoutingError::HandlerRejected {
            step: "chunker".into(),
            transport: TransportType::Grpc,
        };
        assert!(err.to_string().contains("chunker"));
        assert!(err.to_string().contains("grpc"));
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err: RoutingError = TransportError::TopicNotAllowed {
            topic: "backup".into(),
        }
        .into();
        assert!(err.to_string().contains("backup"));
    }

    #[test]
    fn test_step_timeout_error() {
        let err = RoutingError::StepTimeout {
            step: "embedder".into(),
            timeout_ms: 500,
        };
        assert!(err.to_string().contains("500ms"));
    }
}
