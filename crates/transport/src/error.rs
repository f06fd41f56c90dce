//! Transport error types
//!
//! Every remote failure keeps its original cause attached; the fan-out
//! layer above isolates these per output instead of aborting siblings.

use pipework_config::TransportType;
use pipework_discovery::DiscoveryError;
use thiserror::Error;

/// Boxed error type for in-process processor failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while delivering a request or stream
#[derive(Debug, Error)]
pub enum TransportError {
    /// The operation does not exist on this transport
    ///
    /// Distinct from delivery failures so callers can tell "wrong API
    /// used" from "target unreachable".
    #[error("{transport} transport does not support {operation}")]
    UnsupportedOperation {
        /// Transport the caller picked
        transport: TransportType,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Handler invoked for a step it cannot route
    #[error("step '{step}' is not routable over this transport: {detail}")]
    NotRoutable {
        /// Offending step
        step: String,
        /// Why the step cannot be routed
        detail: &'static str,
    },

    /// No declared output matches the requested target over this transport
    #[error("step '{step}' has no {transport} output targeting '{target}'")]
    NoMatchingOutput {
        /// Step whose outputs were searched
        step: String,
        /// Requested target step
        target: String,
        /// Transport of the handler doing the search
        transport: TransportType,
    },

    /// Custom topic rejected by the topic policy
    #[error("topic '{topic}' is not allowed by the topic policy")]
    TopicNotAllowed {
        /// Rejected topic
        topic: String,
    },

    /// Service discovery failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Could not build a channel to the endpoint
    #[error("failed to open channel to {endpoint}: {source}")]
    Connection {
        /// `host:port` of the endpoint
        endpoint: String,
        /// Underlying tonic error
        #[source]
        source: tonic::transport::Error,
    },

    /// Remote call failed
    #[error("grpc call to '{service}' failed: {status}")]
    Grpc {
        /// Logical service that was called
        service: String,
        /// gRPC status carrying the original cause
        #[source]
        status: tonic::Status,
    },

    /// Remote processor answered but reported failure
    #[error("remote processor '{service}' reported failure: {details}")]
    RemoteFailure {
        /// Logical service that was called
        service: String,
        /// Error details from the response
        details: String,
    },

    /// Kafka producer send failed
    #[error("kafka publish to topic '{topic}' failed: {source}")]
    KafkaPublish {
        /// Topic of the failed record
        topic: String,
        /// Underlying rdkafka error
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// Kafka client could not be constructed or subscribed
    #[error("kafka client setup failed: {source}")]
    KafkaSetup {
        /// Underlying rdkafka error
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// No in-process processor registered under the referenced name
    #[error("no internal processor registered as '{processor}'")]
    InternalNotRegistered {
        /// Missing processor name
        processor: String,
    },

    /// In-process processor failed
    #[error("internal processor '{processor}' failed: {source}")]
    Internal {
        /// Processor name
        processor: String,
        /// Underlying processor error
        #[source]
        source: BoxError,
    },
}
