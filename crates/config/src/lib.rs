//! Pipework - Configuration
//!
//! The declarative step model consumed by the routing core: which
//! processor a step runs, which Kafka topics it listens on, where its
//! outputs go and over which transport, and how failures should be
//! retried by the layer above the core.
//!
//! # Invariants
//!
//! All invariants are enforced at construction time, both through the
//! `new` constructors and through serde (`try_from` conversions), so a
//! config object in hand is always valid:
//!
//! - [`ProcessorInfo`]: exactly one of remote-service / in-process is set
//! - [`OutputTarget`]: the transport config present matches the declared
//!   transport type
//! - [`KafkaInputDefinition`]: non-empty topic list, no blank entries
//!
//! # Example
//!
//! ```
//! use pipework_config::{
//!     KafkaTransportConfig, OutputTarget, PipelineStepConfig, ProcessorInfo, StepType,
//! };
//!
//! let step = PipelineStepConfig::new(
//!     "chunker",
//!     StepType::Pipeline,
//!     ProcessorInfo::grpc("chunker-service").unwrap(),
//! )
//! .unwrap()
//! .with_output(
//!     "default",
//!     OutputTarget::kafka("embedder", KafkaTransportConfig::conventional()).unwrap(),
//! );
//!
//! assert_eq!(step.outputs().len(), 1);
//! ```

mod error;
mod kafka;
mod output;
mod step;
mod validation;

pub use error::{ConfigError, Result};
pub use kafka::{
    DEFAULT_BATCH_SIZE, DEFAULT_COMPRESSION_TYPE, DEFAULT_LINGER_MS, DEFAULT_PARTITION_KEY_FIELD,
    DLQ_SUFFIX, KafkaInputDefinition, KafkaTransportConfig,
};
pub use output::{GrpcTransportConfig, OutputTarget, TransportType};
pub use step::{PipelineStepConfig, ProcessorInfo, RetryPolicy, StepType};
pub use validation::PipelineConfig;
