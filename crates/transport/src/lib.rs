//! Pipework - Transport
//!
//! One handler per wire mechanism, all behind the same capability:
//!
//! ```text
//! [Router] ──→ TransportHandler ──┬──→ gRPC    (discovery → cached channel → module/engine contract)
//!                                 ├──→ Kafka   (topic resolution → policy → producer send)
//!                                 └──→ Internal (named in-process processor)
//! ```
//!
//! # Key Design
//!
//! - **Single attempt**: every handler performs exactly one delivery
//!   attempt per invocation; retry policy lives above the core.
//! - **Engine-aware gRPC**: the contract used for a target is chosen by
//!   the kind discovery derived from registry metadata, defaulting to the
//!   leaf-module contract when metadata is absent or unreadable.
//! - **Connection reuse**: [`GrpcClientFactory`] caches one channel per
//!   endpoint; racing callers cannot open duplicates.
//! - **Topic policy**: explicitly configured topics are custom forwarding
//!   and must pass [`TopicPolicy`] before any send; synthesized
//!   conventional names bypass it.

mod client;
mod error;
mod grpc;
mod handler;
mod ingest;
mod internal;
mod kafka;
mod topic_policy;

#[cfg(test)]
mod grpc_test;

pub use client::GrpcClientFactory;
pub use error::{BoxError, Result, TransportError};
pub use grpc::GrpcTransportHandler;
pub use handler::TransportHandler;
pub use ingest::{IngestHandler, KafkaInputListener};
pub use internal::{InternalProcessor, InternalTransportHandler};
pub use kafka::{KafkaTransportHandler, producer_client_config, standard_topic};
pub use topic_policy::{AllowAllTopics, AllowListTopicPolicy, TopicPolicy};
