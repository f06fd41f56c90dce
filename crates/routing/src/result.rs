//! Per-output routing results
//!
//! Stream fan-out reports one result per declared output. A failing
//! output never erases what happened to its siblings, so the result
//! carries the failure inline instead of short-circuiting.

use std::sync::Arc;

use pipework_config::TransportType;

use crate::error::RoutingError;

/// Outcome of one output's routing attempt
#[derive(Debug, Clone)]
pub enum RouteStatus {
    /// The hop was delivered
    Success,
    /// Delivery failed; the message and original cause are preserved
    Failure {
        /// Human-readable failure message
        message: String,
        /// The error that failed this output
        cause: Arc<RoutingError>,
    },
}

/// Result of routing a stream to one declared output
#[derive(Debug, Clone)]
pub struct RoutingResult {
    target_step_name: String,
    transport_type: TransportType,
    status: RouteStatus,
}

impl RoutingResult {
    /// Build a success result
    pub fn success(target_step_name: impl Into<String>, transport_type: TransportType) -> Self {
        Self {
            target_step_name: target_step_name.into(),
            transport_type,
            status: RouteStatus::Success,
        }
    }

    /// Build a failure result from the error that caused it
    pub fn failure(
        target_step_name: impl Into<String>,
        transport_type: TransportType,
        error: RoutingError,
    ) -> Self {
        Self {
            target_step_name: target_step_name.into(),
            transport_type,
            status: RouteStatus::Failure {
                message: error.to_string(),
                cause: Arc::new(error),
            },
        }
    }

    /// Target step this result refers to
    #[inline]
    pub fn target_step_name(&self) -> &str {
        &self.target_step_name
    }

    /// Transport the output was routed over
    #[inline]
    pub fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    /// Status of the attempt
    #[inline]
    pub fn status(&self) -> &RouteStatus {
        &self.status
    }

    /// Whether the hop was delivered
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self.status, RouteStatus::Success)
    }

    /// Failure message, if the attempt failed
    pub fn failure_message(&self) -> Option<&str> {
        match &self.status {
            RouteStatus::Success => None,
            RouteStatus::Failure { message, .. } => Some(message),
        }
    }

    /// Original cause, if the attempt failed
    pub fn cause(&self) -> Option<&RoutingError> {
        match &self.status {
            RouteStatus::Success => None,
            RouteStatus::Failure { cause, .. } => Some(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipework_transport::TransportError;

    #[test]
    fn test_success_result() {
        let result = RoutingResult::success("embedder", TransportType::Grpc);
        assert!(result.is_success());
        assert_eq!(result.target_step_name(), "embedder");
        assert_eq!(result.transport_type(), TransportType::Grpc);
        assert_eq!(result.failure_message(), None);
        assert!(result.cause().is_none());
    }

    #[test]
    fn test_failure_result_keeps_message_and_cause() {
        let error: RoutingError = TransportError::TopicNotAllowed {
            topic: "backup-topic".into(),
        }
        .into();

        let result = RoutingResult::failure("archive", TransportType::Kafka, error);
        assert!(!result.is_success());
        assert!(result.failure_message().unwrap().contains("backup-topic"));
        assert!(matches!(
            result.cause(),
            Some(RoutingError::Transport(TransportError::TopicNotAllowed { .. }))
        ));
    }
}
