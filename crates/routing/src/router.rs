//! Router - transport dispatch with concurrent fan-out
//!
//! The router maps each declared output of a step to the handler
//! registered for that output's transport type and collects one tagged
//! result per output. It never touches a wire protocol itself.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use pipework_config::{OutputTarget, PipelineStepConfig, TransportType};
use pipework_protocol::{PipeStream, ProcessRequest, ProcessResponse};
use pipework_transport::TransportHandler;

use crate::error::{Result, RoutingError};
use crate::events::{RoutingEvent, RoutingEventSink};
use crate::metrics::RouterMetrics;
use crate::result::RoutingResult;

/// Transport-dispatching router
///
/// # Design
///
/// - Handlers are registered at composition time through `&mut self`;
///   afterward the router is shared behind `Arc` and only read, so the
///   handler map needs no lock.
/// - `route_request` always dispatches over gRPC: synchronous call
///   semantics exist on no other transport in this system.
/// - `route_stream` fans out to every declared output concurrently; one
///   output's failure is isolated in its own [`RoutingResult`] and never
///   aborts siblings. Relative completion order between outputs is not
///   guaranteed.
/// - Routing events are published around each attempt for monitoring
///   only; they cannot affect control flow.
///
/// # Example
///
/// ```ignore
/// let mut router = Router::new();
/// router.register_transport_handler(Arc::new(grpc_handler));
/// router.register_transport_handler(Arc::new(kafka_handler));
/// let router = Arc::new(router);
///
/// let results = router.route_stream(stream, &step).await;
/// ```
pub struct Router {
    /// Transport type → handler, write-once at startup
    handlers: HashMap<TransportType, Arc<dyn TransportHandler>>,

    /// Optional observer for routing lifecycle events
    events: Option<Arc<dyn RoutingEventSink>>,

    /// Router metrics (Arc so snapshots outlive shared routers)
    metrics: Arc<RouterMetrics>,
}

impl Router {
    /// Create a router with no handlers registered
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            events: None,
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    /// Register a handler under its own transport type
    ///
    /// Replaces any previously registered handler for that transport.
    pub fn register_transport_handler(&mut self, handler: Arc<dyn TransportHandler>) {
        let transport = handler.transport_type();
        tracing::debug!(transport = %transport, "registered transport handler");
        self.handlers.insert(transport, handler);
    }

    /// Set the routing event sink
    pub fn set_event_sink(&mut self, sink: Arc<dyn RoutingEventSink>) {
        self.events = Some(sink);
    }

    /// Whether a handler is registered for a transport
    #[inline]
    pub fn has_handler(&self, transport: TransportType) -> bool {
        self.handlers.contains_key(&transport)
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Get the router metrics
    #[inline]
    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }

    /// Route a request synchronously and wait for the response
    ///
    /// Always dispatches over gRPC regardless of the step's output
    /// transports: synchronous calls are gRPC-only in this system, Kafka
    /// exists for output fan-out alone.
    ///
    /// # Errors
    ///
    /// Fails when no gRPC handler is registered, when the handler cannot
    /// handle the step, or when delivery fails.
    pub async fn route_request(
        &self,
        request: ProcessRequest,
        step: &PipelineStepConfig,
    ) -> Result<ProcessResponse> {
        let handler = self
            .handlers
            .get(&TransportType::Grpc)
            .ok_or(RoutingError::NoHandler {
                transport: TransportType::Grpc,
            })?;

        if !handler.can_handle(step) {
            return Err(RoutingError::HandlerRejected {
                step: step.step_name().to_string(),
                transport: TransportType::Grpc,
            });
        }

        match handler.route_request(request, step).await {
            Ok(response) => {
                self.metrics.record_request_routed();
                Ok(response)
            }
            Err(e) => {
                self.metrics.record_request_failed();
                tracing::warn!(
                    step = %step.step_name(),
                    error = %e,
                    "request routing failed"
                );
                Err(RoutingError::Transport(e))
            }
        }
    }

    /// Route a stream to every declared output of the current step
    ///
    /// Outputs are routed concurrently and independently; the returned
    /// list holds one result per declared output. A step with zero
    /// outputs yields an empty list, not an error.
    pub async fn route_stream(
        &self,
        stream: PipeStream,
        step: &PipelineStepConfig,
    ) -> Vec<RoutingResult> {
        self.metrics.record_stream_received();

        if step.outputs().is_empty() {
            tracing::trace!(
                step = %step.step_name(),
                stream = %stream.stream_id,
                "step declares no outputs"
            );
            return Vec::new();
        }

        let attempts = step
            .outputs()
            .values()
            .map(|output| self.route_output(&stream, step, output));

        join_all(attempts).await
    }

    /// Route one output, mapping the outcome to a tagged result
    async fn route_output(
        &self,
        stream: &PipeStream,
        step: &PipelineStepConfig,
        output: &OutputTarget,
    ) -> RoutingResult {
        let target = output.target_step_name();
        let transport = output.transport_type();

        self.emit(RoutingEvent::Started {
            stream_id: stream.stream_id.clone(),
            step_name: step.step_name().to_string(),
            target_step_name: target.to_string(),
            transport_type: transport,
        });

        let outcome = match self.handlers.get(&transport) {
            None => Err(RoutingError::NoHandler { transport }),
            Some(handler) => handler
                .route_stream(stream.clone(), target, step)
                .await
                .map_err(RoutingError::Transport),
        };

        match outcome {
            Ok(()) => {
                self.metrics.record_output_routed();
                self.emit(RoutingEvent::Completed {
                    stream_id: stream.stream_id.clone(),
                    step_name: step.step_name().to_string(),
                    target_step_name: target.to_string(),
                    transport_type: transport,
                });
                tracing::debug!(
                    step = %step.step_name(),
                    target = %target,
                    transport = %transport,
                    "output routed"
                );
                RoutingResult::success(target, transport)
            }
            Err(error) => {
                self.metrics.record_output_failed();
                tracing::warn!(
                    step = %step.step_name(),
                    target = %target,
                    transport = %transport,
                    error = %error,
                    "output routing failed"
                );
                self.emit(RoutingEvent::Failed {
                    stream_id: stream.stream_id.clone(),
                    step_name: step.step_name().to_string(),
                    target_step_name: target.to_string(),
                    transport_type: transport,
                    message: error.to_string(),
                });
                RoutingResult::failure(target, transport, error)
            }
        }
    }

    fn emit(&self, event: RoutingEvent) {
        if let Some(sink) = &self.events {
            sink.on_event(&event);
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("handler_count", &self.handler_count())
            .field("has_event_sink", &self.events.is_some())
            .finish()
    }
}
