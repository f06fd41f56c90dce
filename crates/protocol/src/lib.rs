//! Pipework - Protocol
//!
//! Wire contracts shared by the engine, leaf modules, and peer engines.
//!
//! Two gRPC services are defined over the same message vocabulary:
//!
//! - `PipeStepProcessor`: the leaf-module contract, process one document
//!   (`ProcessData`).
//! - `PipeStreamEngine`: the engine-to-engine contract, process one stream
//!   hop (`ProcessPipeStream`).
//!
//! Which contract applies to a target is decided by registry metadata at
//! discovery time, not by a different transport type.
//!
//! Kafka delivery reuses the same vocabulary: a [`PipeStream`] is
//! prost-encoded as the record payload (`Message::encode_to_vec`).

mod stream;

tonic::include_proto!("pipework");

// Re-export the prost trait so downstream crates can encode/decode payloads
// without naming prost directly.
pub use prost::Message;
