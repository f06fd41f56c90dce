//! Kafka input listener
//!
//! The fan-in side of the transport layer: a step that declares Kafka
//! inputs gets a consumer subscribed to its topics, decoding each record
//! back into a stream hop and handing it to the engine's processing
//! callback. Undecodable records are logged and skipped; consume errors
//! back off and continue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message as KafkaMessage;
use tokio::task::JoinHandle;

use pipework_config::KafkaInputDefinition;
use pipework_protocol::{Message, PipeStream};

use crate::error::{Result, TransportError};

/// Pause after a consume error before polling again
const CONSUME_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Receives stream hops decoded off a step's input topics
#[async_trait]
pub trait IngestHandler: Send + Sync {
    /// Handle one decoded stream hop
    async fn handle(&self, stream: PipeStream);
}

/// Consumer loop for one step's declared Kafka inputs
pub struct KafkaInputListener {
    consumer: StreamConsumer,
    step_name: String,
    topics: Vec<String>,
}

impl KafkaInputListener {
    /// Build and subscribe a consumer for a step's input definition
    ///
    /// The consumer group is the configured id, or the synthesized
    /// `"<pipeline>.<step>"` when none is configured.
    ///
    /// # Errors
    ///
    /// Fails if the consumer cannot be constructed or subscribed.
    pub fn new(
        brokers: &str,
        pipeline_name: &str,
        step_name: &str,
        input: &KafkaInputDefinition,
    ) -> Result<Self> {
        let group = input.consumer_group_or_default(pipeline_name, step_name);

        let mut client_config = ClientConfig::new();
        client_config
            .set("group.id", &group)
            .set("bootstrap.servers", brokers)
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("auto.offset.reset", "earliest");
        for (key, value) in input.consumer_properties() {
            client_config.set(key, value);
        }

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|source| TransportError::KafkaSetup { source })?;

        let topics: Vec<&str> = input.listen_topics().iter().map(String::as_str).collect();
        consumer
            .subscribe(&topics)
            .map_err(|source| TransportError::KafkaSetup { source })?;

        tracing::info!(
            step = %step_name,
            group = %group,
            topics = ?input.listen_topics(),
            "kafka input listener subscribed"
        );

        Ok(Self {
            consumer,
            step_name: step_name.to_string(),
            topics: input.listen_topics().to_vec(),
        })
    }

    /// Topics this listener consumes
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Run the consume loop on a background task
    ///
    /// The task runs until aborted via the returned handle.
    pub fn spawn(self, handler: Arc<dyn IngestHandler>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.consumer.recv().await {
                    Ok(record) => {
                        let Some(payload) = record.payload() else {
                            tracing::warn!(
                                step = %self.step_name,
                                topic = record.topic(),
                                "skipping record with empty payload"
                            );
                            continue;
                        };

                        match PipeStream::decode(payload) {
                            Ok(stream) => handler.handle(stream).await,
                            Err(e) => {
                                tracing::warn!(
                                    step = %self.step_name,
                                    topic = record.topic(),
                                    partition = record.partition(),
                                    offset = record.offset(),
                                    error = %e,
                                    "skipping undecodable record"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            step = %self.step_name,
                            error = %e,
                            "kafka consume error, backing off"
                        );
                        tokio::time::sleep(CONSUME_ERROR_BACKOFF).await;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for KafkaInputListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaInputListener")
            .field("step_name", &self.step_name)
            .field("topics", &self.topics)
            .finish()
    }
}
