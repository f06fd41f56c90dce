//! Internal (in-process) transport handler
//!
//! Some processors run inside the engine process instead of behind a
//! network hop. They register here by name at composition time; routing
//! to them is a direct invocation with no wire format in between.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use pipework_config::{PipelineStepConfig, TransportType};
use pipework_protocol::{PipeStream, ProcessRequest, ProcessResponse};

use crate::error::{BoxError, Result, TransportError};
use crate::handler::TransportHandler;

/// An in-process document processor
#[async_trait]
pub trait InternalProcessor: Send + Sync {
    /// Process one document
    async fn process(&self, request: ProcessRequest)
    -> std::result::Result<ProcessResponse, BoxError>;
}

/// Handler invoking in-process processors registered by name
///
/// The processor map is populated at composition time and read-only
/// afterward; the handler is shared behind `Arc` once registration is
/// done.
#[derive(Default)]
pub struct InternalTransportHandler {
    processors: HashMap<String, Arc<dyn InternalProcessor>>,
}

impl InternalTransportHandler {
    /// Create a handler with no processors
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor under a name
    pub fn register(&mut self, name: impl Into<String>, processor: Arc<dyn InternalProcessor>) {
        let name = name.into();
        tracing::debug!(processor = %name, "registered internal processor");
        self.processors.insert(name, processor);
    }

    /// Number of registered processors
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    async fn invoke(&self, name: &str, request: ProcessRequest) -> Result<ProcessResponse> {
        let processor = self.processors.get(name).ok_or_else(|| {
            TransportError::InternalNotRegistered {
                processor: name.to_string(),
            }
        })?;

        processor
            .process(request)
            .await
            .map_err(|source| TransportError::Internal {
                processor: name.to_string(),
                source,
            })
    }
}

#[async_trait]
impl TransportHandler for InternalTransportHandler {
    fn transport_type(&self) -> TransportType {
        TransportType::Internal
    }

    fn can_handle(&self, step: &PipelineStepConfig) -> bool {
        step.processor().internal_processor_name().is_some()
    }

    async fn route_request(
        &self,
        request: ProcessRequest,
        step: &PipelineStepConfig,
    ) -> Result<ProcessResponse> {
        let name = step.processor().internal_processor_name().ok_or_else(|| {
            TransportError::NotRoutable {
                step: step.step_name().to_string(),
                detail: "processor has no internal processor name",
            }
        })?;

        self.invoke(name, request).await
    }

    async fn route_stream(
        &self,
        stream: PipeStream,
        target_step_name: &str,
        step: &PipelineStepConfig,
    ) -> Result<()> {
        // Internal outputs carry no transport config; the target step name
        // doubles as the processor registration name.
        step.outputs()
            .values()
            .find(|o| {
                o.target_step_name() == target_step_name
                    && o.transport_type() == TransportType::Internal
            })
            .ok_or_else(|| TransportError::NoMatchingOutput {
                step: step.step_name().to_string(),
                target: target_step_name.to_string(),
                transport: TransportType::Internal,
            })?;

        let request = stream.for_target(target_step_name).into_request();
        let response = self.invoke(target_step_name, request).await?;

        if !response.success {
            return Err(TransportError::Internal {
                processor: target_step_name.to_string(),
                source: response.error_details.into(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for InternalTransportHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalTransportHandler")
            .field("processor_count", &self.processor_count())
            .finish()
    }
}
