//! gRPC transport handler
//!
//! Resolves the target service through discovery, fetches a cached
//! channel, and invokes the contract matching the instance's registered
//! kind: the leaf-module call for modules, the stream-hop call for peer
//! engines. The kind was derived from registry metadata at discovery
//! time, so an unknown or failed metadata lookup routes as a module.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use pipework_config::{PipelineStepConfig, TransportType};
use pipework_discovery::{ServiceDiscovery, ServiceKind};
use pipework_protocol::pipe_step_processor_client::PipeStepProcessorClient;
use pipework_protocol::pipe_stream_engine_client::PipeStreamEngineClient;
use pipework_protocol::{PipeStream, ProcessRequest, ProcessResponse};

use crate::client::GrpcClientFactory;
use crate::error::{Result, TransportError};
use crate::handler::TransportHandler;

/// Handler delivering requests and streams over gRPC
pub struct GrpcTransportHandler {
    discovery: Arc<dyn ServiceDiscovery>,
    clients: Arc<GrpcClientFactory>,
}

impl GrpcTransportHandler {
    /// Create a handler over the given discovery and client cache
    pub fn new(discovery: Arc<dyn ServiceDiscovery>, clients: Arc<GrpcClientFactory>) -> Self {
        Self { discovery, clients }
    }

    /// Resolve and invoke a service with the contract matching its kind
    async fn call_service(
        &self,
        service_name: &str,
        request: ProcessRequest,
        client_properties: &BTreeMap<String, String>,
    ) -> Result<ProcessResponse> {
        let instance = self.discovery.discover_service(service_name).await?;
        let channel = self
            .clients
            .get_client_configured(instance.host(), instance.port(), client_properties)
            .await?;

        let response = match instance.kind() {
            ServiceKind::Module => {
                tracing::debug!(
                    service = %service_name,
                    instance = %instance,
                    "invoking module processing contract"
                );
                PipeStepProcessorClient::new(channel)
                    .process_data(request)
                    .await
            }
            ServiceKind::Engine => {
                // Same transport, different contract: wrap the request into
                // a stream envelope and let the peer engine unwrap it.
                tracing::debug!(
                    service = %service_name,
                    instance = %instance,
                    "target is an engine, invoking stream contract"
                );
                PipeStreamEngineClient::new(channel)
                    .process_pipe_stream(request.into_stream_envelope())
                    .await
            }
        };

        response.map(tonic::Response::into_inner).map_err(|status| {
            tracing::warn!(
                service = %service_name,
                instance = %instance,
                error = %status,
                "grpc call failed"
            );
            TransportError::Grpc {
                service: service_name.to_string(),
                status,
            }
        })
    }
}

#[async_trait]
impl TransportHandler for GrpcTransportHandler {
    fn transport_type(&self) -> TransportType {
        TransportType::Grpc
    }

    fn can_handle(&self, step: &PipelineStepConfig) -> bool {
        step.processor().grpc_service_name().is_some()
    }

    async fn route_request(
        &self,
        request: ProcessRequest,
        step: &PipelineStepConfig,
    ) -> Result<ProcessResponse> {
        let service_name = step.processor().grpc_service_name().ok_or_else(|| {
            TransportError::NotRoutable {
                step: step.step_name().to_string(),
                detail: "processor has no grpc service name",
            }
        })?;

        self.call_service(service_name, request, &BTreeMap::new()).await
    }

    async fn route_stream(
        &self,
        stream: PipeStream,
        target_step_name: &str,
        step: &PipelineStepConfig,
    ) -> Result<()> {
        let grpc = step
            .outputs()
            .values()
            .filter(|o| o.target_step_name() == target_step_name)
            .find_map(|o| o.grpc_transport())
            .ok_or_else(|| TransportError::NoMatchingOutput {
                step: step.step_name().to_string(),
                target: target_step_name.to_string(),
                transport: TransportType::Grpc,
            })?;
        let service_name = grpc.service_name().to_string();

        let request = stream.for_target(target_step_name).into_request();
        let response = self
            .call_service(&service_name, request, grpc.client_properties())
            .await?;

        if !response.success {
            return Err(TransportError::RemoteFailure {
                service: service_name,
                details: response.error_details,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for GrpcTransportHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcTransportHandler").finish_non_exhaustive()
    }
}
