//! Transport handler capability
//!
//! One handler per wire mechanism. The router owns a registry of these
//! and never touches a wire protocol itself.

use async_trait::async_trait;

use pipework_config::{PipelineStepConfig, TransportType};
use pipework_protocol::{PipeStream, ProcessRequest, ProcessResponse};

use crate::error::Result;

/// Delivery of requests and streams over one wire protocol
///
/// Handlers perform exactly one delivery attempt per invocation; retries
/// are the responsibility of the layer above.
#[async_trait]
pub trait TransportHandler: Send + Sync {
    /// The transport this handler serves
    fn transport_type(&self) -> TransportType;

    /// Whether this handler can route the given step at all
    fn can_handle(&self, step: &PipelineStepConfig) -> bool;

    /// Deliver a request and wait for the response (synchronous semantics)
    ///
    /// # Errors
    ///
    /// Async-only transports fail with
    /// [`TransportError::UnsupportedOperation`](crate::TransportError::UnsupportedOperation);
    /// remote failures propagate with their original cause attached.
    async fn route_request(
        &self,
        request: ProcessRequest,
        step: &PipelineStepConfig,
    ) -> Result<ProcessResponse>;

    /// Deliver a stream to the named downstream step (asynchronous semantics)
    ///
    /// # Errors
    ///
    /// Fails when the step declares no matching output for the target over
    /// this transport, or when delivery itself fails.
    async fn route_stream(
        &self,
        stream: PipeStream,
        target_step_name: &str,
        step: &PipelineStepConfig,
    ) -> Result<()>;
}
