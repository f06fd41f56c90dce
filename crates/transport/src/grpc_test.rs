//! gRPC handler tests
//!
//! These spin up real in-process tonic servers on ephemeral ports so the
//! engine-vs-module dispatch and failure propagation are exercised over
//! the actual wire contract, not mocks of it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status, transport::Server};

use pipework_config::{GrpcTransportConfig, OutputTarget, PipelineStepConfig, ProcessorInfo, StepType};
use pipework_discovery::{RegistryDiscovery, ServiceInstance, StaticModuleRegistry};
use pipework_protocol::pipe_step_processor_server::{PipeStepProcessor, PipeStepProcessorServer};
use pipework_protocol::pipe_stream_engine_server::{PipeStreamEngine, PipeStreamEngineServer};
use pipework_protocol::{PipeDoc, PipeStream, ProcessRequest, ProcessResponse};

use crate::client::GrpcClientFactory;
use crate::error::TransportError;
use crate::grpc::GrpcTransportHandler;
use crate::handler::TransportHandler;

/// Module test double: echoes the document back, counting calls
#[derive(Default)]
struct EchoModule {
    calls: Arc<AtomicU64>,
}

#[tonic::async_trait]
impl PipeStepProcessor for EchoModule {
    async fn process_data(
        &self,
        request: Request<ProcessRequest>,
    ) -> Result<Response<ProcessResponse>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = request.into_inner();
        Ok(Response::new(ProcessResponse::ok(request.document)))
    }
}

/// Module test double that always fails at the gRPC layer
struct FailingModule;

#[tonic::async_trait]
impl PipeStepProcessor for FailingModule {
    async fn process_data(
        &self,
        _request: Request<ProcessRequest>,
    ) -> Result<Response<ProcessResponse>, Status> {
        Err(Status::internal("embedder exploded"))
    }
}

/// Engine test double: records that the stream contract was used
#[derive(Default)]
struct RecordingEngine {
    calls: Arc<AtomicU64>,
}

#[tonic::async_trait]
impl PipeStreamEngine for RecordingEngine {
    async fn process_pipe_stream(
        &self,
        request: Request<PipeStream>,
    ) -> Result<Response<ProcessResponse>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stream = request.into_inner();
        Ok(Response::new(ProcessResponse::ok(stream.document)))
    }
}

async fn spawn_module(module: impl PipeStepProcessor) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(
        Server::builder()
            .add_service(PipeStepProcessorServer::new(module))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    port
}

async fn spawn_engine(engine: impl PipeStreamEngine) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(
        Server::builder()
            .add_service(PipeStreamEngineServer::new(engine))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    port
}

fn handler_for(registry: StaticModuleRegistry) -> GrpcTransportHandler {
    GrpcTransportHandler::new(
        Arc::new(RegistryDiscovery::new(Arc::new(registry))),
        Arc::new(GrpcClientFactory::new()),
    )
}

fn grpc_step(service: &str) -> PipelineStepConfig {
    PipelineStepConfig::new(
        "embedder",
        StepType::Pipeline,
        ProcessorInfo::grpc(service).unwrap(),
    )
    .unwrap()
}

fn request(doc_id: &str) -> ProcessRequest {
    ProcessRequest {
        document: Some(PipeDoc {
            id: doc_id.to_string(),
            ..Default::default()
        }),
        metadata: None,
        config: None,
    }
}

// ============================================================================
// can_handle
// ============================================================================

#[tokio::test]
async fn test_can_handle_requires_grpc_service_name() {
    let handler = handler_for(StaticModuleRegistry::new());

    assert!(handler.can_handle(&grpc_step("embedder-service")));

    let internal_step = PipelineStepConfig::new(
        "local",
        StepType::Pipeline,
        ProcessorInfo::internal("echo").unwrap(),
    )
    .unwrap();
    assert!(!handler.can_handle(&internal_step));
}

// ============================================================================
// route_request
// ============================================================================

#[tokio::test]
async fn test_route_request_to_module() {
    let calls = Arc::new(AtomicU64::new(0));
    let port = spawn_module(EchoModule {
        calls: Arc::clone(&calls),
    })
    .await;

    let registry = StaticModuleRegistry::new();
    registry.register(ServiceInstance::module("i-1", "embedder-service", "127.0.0.1", port));
    let handler = handler_for(registry);

    let response = handler
        .route_request(request("doc-1"), &grpc_step("embedder-service"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.output_doc.unwrap().id, "doc-1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_route_request_to_engine_uses_stream_contract() {
    let calls = Arc::new(AtomicU64::new(0));
    let port = spawn_engine(RecordingEngine {
        calls: Arc::clone(&calls),
    })
    .await;

    // Registered as an engine, so the request must be translated into the
    // stream envelope and sent over the engine contract.
    let registry = StaticModuleRegistry::new();
    registry.register(ServiceInstance::engine("i-1", "peer-engine", "127.0.0.1", port));
    let handler = handler_for(registry);

    let response = handler
        .route_request(request("doc-2"), &grpc_step("peer-engine"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.output_doc.unwrap().id, "doc-2");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_route_request_propagates_remote_failure() {
    let port = spawn_module(FailingModule).await;

    let registry = StaticModuleRegistry::new();
    registry.register(ServiceInstance::module("i-1", "embedder-service", "127.0.0.1", port));
    let handler = handler_for(registry);

    let err = handler
        .route_request(request("doc-3"), &grpc_step("embedder-service"))
        .await
        .unwrap_err();

    match err {
        TransportError::Grpc { service, status } => {
            assert_eq!(service, "embedder-service");
            assert_eq!(status.code(), tonic::Code::Internal);
            assert!(status.message().contains("embedder exploded"));
        }
        other => panic!("expected grpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_route_request_fails_without_instances() {
    let handler = handler_for(StaticModuleRegistry::new());

    let err = handler
        .route_request(request("doc-4"), &grpc_step("embedder-service"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Discovery(_)));
}

// ============================================================================
// route_stream
// ============================================================================

fn stream(doc_id: &str) -> PipeStream {
    PipeStream {
        stream_id: "stream-1".to_string(),
        document: Some(PipeDoc {
            id: doc_id.to_string(),
            ..Default::default()
        }),
        current_pipeline_name: "search-indexing".to_string(),
        target_step_name: "chunker".to_string(),
        current_hop_number: 1,
        context_params: Default::default(),
    }
}

#[tokio::test]
async fn test_route_stream_to_grpc_output() {
    let calls = Arc::new(AtomicU64::new(0));
    let port = spawn_module(EchoModule {
        calls: Arc::clone(&calls),
    })
    .await;

    let registry = StaticModuleRegistry::new();
    registry.register(ServiceInstance::module("i-1", "embedder-service", "127.0.0.1", port));
    let handler = handler_for(registry);

    let step = grpc_step("chunker-service").with_output(
        "default",
        OutputTarget::grpc("embedder", GrpcTransportConfig::new("embedder-service").unwrap())
            .unwrap(),
    );

    handler.route_stream(stream("doc-5"), "embedder", &step).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_route_stream_without_matching_output() {
    let handler = handler_for(StaticModuleRegistry::new());
    let step = grpc_step("chunker-service");

    let err = handler
        .route_stream(stream("doc-6"), "embedder", &step)
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::NoMatchingOutput { .. }));
}
