//! Kafka transport handler
//!
//! Fire-and-forget publish of stream hops onto topics. Request/response
//! semantics do not exist here: the synchronous path fails with a typed
//! `UnsupportedOperation` so callers can tell a wrong API call apart from
//! an unreachable target.
//!
//! # Topic resolution
//!
//! An output with an explicitly configured topic is custom forwarding and
//! must pass the topic policy before any send. An output without a topic
//! publishes to the synthesized standard name
//! `"<pipelineName>.<targetStepName>.input"`, which is derived rather
//! than user-supplied and bypasses the policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use pipework_config::{
    DEFAULT_PARTITION_KEY_FIELD, KafkaTransportConfig, PipelineStepConfig, TransportType,
};
use pipework_protocol::{Message, PipeStream, ProcessRequest, ProcessResponse};

use crate::error::{Result, TransportError};
use crate::handler::TransportHandler;
use crate::topic_policy::TopicPolicy;

/// Producer send timeout (queue + delivery)
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Standard topic name for a step's input: `"<pipeline>.<step>.input"`
pub fn standard_topic(pipeline_name: &str, target_step_name: &str) -> String {
    format!("{pipeline_name}.{target_step_name}.input")
}

/// Producer config for a broker list, with a transport config's merged
/// producer properties applied on top
pub fn producer_client_config(brokers: &str, config: &KafkaTransportConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", brokers);
    client_config.set("message.timeout.ms", "5000");
    for (key, value) in config.all_producer_properties() {
        client_config.set(key, value);
    }
    client_config
}

/// Handler publishing stream hops onto Kafka topics
pub struct KafkaTransportHandler {
    producer: FutureProducer,
    topic_policy: Arc<dyn TopicPolicy>,
}

impl KafkaTransportHandler {
    /// Create a handler over an existing producer
    pub fn new(producer: FutureProducer, topic_policy: Arc<dyn TopicPolicy>) -> Self {
        Self {
            producer,
            topic_policy,
        }
    }

    /// Create a handler with a default producer for the given brokers
    ///
    /// # Errors
    ///
    /// Fails if the producer cannot be constructed.
    pub fn from_brokers(brokers: &str, topic_policy: Arc<dyn TopicPolicy>) -> Result<Self> {
        let producer = producer_client_config(brokers, &KafkaTransportConfig::conventional())
            .create()
            .map_err(|source| TransportError::KafkaSetup { source })?;
        Ok(Self::new(producer, topic_policy))
    }

    fn resolve_topic(
        &self,
        kafka: &KafkaTransportConfig,
        pipeline_name: &str,
        target_step_name: &str,
    ) -> Result<String> {
        match kafka.topic() {
            Some(custom) => {
                if !self.topic_policy.is_topic_allowed(custom) {
                    tracing::warn!(
                        topic = %custom,
                        target = %target_step_name,
                        "custom topic rejected by topic policy"
                    );
                    return Err(TransportError::TopicNotAllowed {
                        topic: custom.to_string(),
                    });
                }
                Ok(custom.to_string())
            }
            None => Ok(standard_topic(pipeline_name, target_step_name)),
        }
    }
}

/// Record key for a stream hop
///
/// Only the document-id field is supported today; a configured field
/// other than the default degrades to the document id with a warning.
/// Streams without a document fall back to the stream id so related
/// records still land on one partition.
fn partition_key(stream: &PipeStream, configured_field: &str) -> String {
    if configured_field != DEFAULT_PARTITION_KEY_FIELD {
        tracing::warn!(
            field = %configured_field,
            fallback = DEFAULT_PARTITION_KEY_FIELD,
            "unsupported partition key field, using default"
        );
    }
    stream
        .document_id()
        .map(str::to_string)
        .unwrap_or_else(|| stream.stream_id.clone())
}

#[async_trait]
impl TransportHandler for KafkaTransportHandler {
    fn transport_type(&self) -> TransportType {
        TransportType::Kafka
    }

    fn can_handle(&self, step: &PipelineStepConfig) -> bool {
        step.outputs().values().any(|o| o.kafka_transport().is_some())
    }

    async fn route_request(
        &self,
        _request: ProcessRequest,
        _step: &PipelineStepConfig,
    ) -> Result<ProcessResponse> {
        // Kafka is fire-and-forget; there is no response to wait for.
        Err(TransportError::UnsupportedOperation {
            transport: TransportType::Kafka,
            operation: "route_request",
        })
    }

    async fn route_stream(
        &self,
        stream: PipeStream,
        target_step_name: &str,
        step: &PipelineStepConfig,
    ) -> Result<()> {
        let kafka = step
            .outputs()
            .values()
            .filter(|o| o.target_step_name() == target_step_name)
            .find_map(|o| o.kafka_transport())
            .ok_or_else(|| TransportError::NoMatchingOutput {
                step: step.step_name().to_string(),
                target: target_step_name.to_string(),
                transport: TransportType::Kafka,
            })?;

        let topic =
            self.resolve_topic(kafka, &stream.current_pipeline_name, target_step_name)?;
        let key = partition_key(&stream, kafka.partition_key_field());
        let payload = stream.for_target(target_step_name).encode_to_vec();

        tracing::debug!(
            step = %step.step_name(),
            target = %target_step_name,
            topic = %topic,
            key = %key,
            bytes = payload.len(),
            "publishing stream hop"
        );

        let record = FutureRecord::to(&topic).payload(&payload).key(&key);
        self.producer
            .send(record, SEND_TIMEOUT)
            .await
            .map_err(|(source, _record)| {
                tracing::error!(
                    step = %step.step_name(),
                    target = %target_step_name,
                    topic = %topic,
                    error = %source,
                    "kafka publish failed"
                );
                TransportError::KafkaPublish { topic, source }
            })?;

        Ok(())
    }
}

impl std::fmt::Debug for KafkaTransportHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaTransportHandler").finish_non_exhaustive()
    }
}
