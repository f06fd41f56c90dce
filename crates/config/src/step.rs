//! Pipeline step configuration
//!
//! A step names one stage of a pipeline: its processor reference, the
//! Kafka topics it consumes, its named output fan-out, and its retry
//! policy. Step configs are produced and validated once per pipeline
//! definition and are read-only during routing.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::kafka::KafkaInputDefinition;
use crate::output::OutputTarget;

/// Position of a step within a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    /// Interior stage with upstream and downstream neighbors
    Pipeline,
    /// Entry stage: receives work from outside the pipeline
    InitialPipeline,
    /// Terminal stage: no declared outputs expected
    Sink,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pipeline => "pipeline",
            Self::InitialPipeline => "initial_pipeline",
            Self::Sink => "sink",
        };
        f.write_str(name)
    }
}

/// Processor reference: remote gRPC service or in-process processor
///
/// # Invariant
///
/// Exactly one of the two references is set. Blank strings count as unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawProcessorInfo")]
pub struct ProcessorInfo {
    grpc_service_name: Option<String>,
    internal_processor_bean_name: Option<String>,
}

impl ProcessorInfo {
    /// Create a processor reference, enforcing the exactly-one invariant
    ///
    /// # Errors
    ///
    /// Returns an error when both references are set or neither is.
    pub fn new(
        grpc_service_name: Option<String>,
        internal_processor_bean_name: Option<String>,
    ) -> Result<Self> {
        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let grpc_service_name = non_blank(grpc_service_name);
        let internal_processor_bean_name = non_blank(internal_processor_bean_name);

        match (&grpc_service_name, &internal_processor_bean_name) {
            (Some(_), Some(_)) => Err(ConfigError::ProcessorChoice { detail: "both set" }),
            (None, None) => Err(ConfigError::ProcessorChoice {
                detail: "neither set",
            }),
            _ => Ok(Self {
                grpc_service_name,
                internal_processor_bean_name,
            }),
        }
    }

    /// Reference a remote gRPC service
    pub fn grpc(service_name: impl Into<String>) -> Result<Self> {
        Self::new(Some(service_name.into()), None)
    }

    /// Reference an in-process processor by registered name
    pub fn internal(processor_name: impl Into<String>) -> Result<Self> {
        Self::new(None, Some(processor_name.into()))
    }

    /// Remote service name, if this is a remote reference
    #[inline]
    pub fn grpc_service_name(&self) -> Option<&str> {
        self.grpc_service_name.as_deref()
    }

    /// In-process processor name, if this is a local reference
    #[inline]
    pub fn internal_processor_name(&self) -> Option<&str> {
        self.internal_processor_bean_name.as_deref()
    }

    /// Whether the processor runs out of process
    #[inline]
    pub fn is_remote(&self) -> bool {
        self.grpc_service_name.is_some()
    }
}

#[derive(Deserialize)]
struct RawProcessorInfo {
    #[serde(default)]
    grpc_service_name: Option<String>,
    #[serde(default)]
    internal_processor_bean_name: Option<String>,
}

impl TryFrom<RawProcessorInfo> for ProcessorInfo {
    type Error = ConfigError;

    fn try_from(raw: RawProcessorInfo) -> Result<Self> {
        ProcessorInfo::new(raw.grpc_service_name, raw.internal_processor_bean_name)
    }
}

/// Per-step retry policy
///
/// Carried on the step for the retry layer above the routing core; the
/// transport handlers themselves perform exactly one attempt per call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,

    /// Initial backoff between attempts, in milliseconds
    pub backoff_ms: u64,

    /// Upper bound on the backoff, in milliseconds
    pub max_backoff_ms: u64,

    /// Multiplier applied to the backoff after each failed attempt
    pub backoff_multiplier: f64,

    /// Overall deadline for the step including retries, in milliseconds
    pub step_timeout_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            step_timeout_ms: None,
        }
    }
}

/// Configuration of one pipeline step
///
/// Immutable once constructed; the routing core only ever reads it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawPipelineStepConfig")]
pub struct PipelineStepConfig {
    step_name: String,
    step_type: StepType,
    processor: ProcessorInfo,
    kafka_inputs: Vec<KafkaInputDefinition>,
    outputs: BTreeMap<String, OutputTarget>,
    retry: RetryPolicy,
}

impl PipelineStepConfig {
    /// Create a step with no inputs or outputs
    ///
    /// # Errors
    ///
    /// Returns an error if the step name is blank.
    pub fn new(
        step_name: impl Into<String>,
        step_type: StepType,
        processor: ProcessorInfo,
    ) -> Result<Self> {
        let step_name = step_name.into();
        if step_name.trim().is_empty() {
            return Err(ConfigError::missing_field("step", step_name, "step_name"));
        }
        Ok(Self {
            step_name,
            step_type,
            processor,
            kafka_inputs: Vec::new(),
            outputs: BTreeMap::new(),
            retry: RetryPolicy::default(),
        })
    }

    /// Add a named output
    #[must_use]
    pub fn with_output(mut self, name: impl Into<String>, output: OutputTarget) -> Self {
        self.outputs.insert(name.into(), output);
        self
    }

    /// Add a Kafka input definition
    #[must_use]
    pub fn with_kafka_input(mut self, input: KafkaInputDefinition) -> Self {
        self.kafka_inputs.push(input);
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Step name
    #[inline]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Step type
    #[inline]
    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    /// Processor reference
    #[inline]
    pub fn processor(&self) -> &ProcessorInfo {
        &self.processor
    }

    /// Kafka inputs this step consumes
    #[inline]
    pub fn kafka_inputs(&self) -> &[KafkaInputDefinition] {
        &self.kafka_inputs
    }

    /// Named output fan-out, ordered by output name
    #[inline]
    pub fn outputs(&self) -> &BTreeMap<String, OutputTarget> {
        &self.outputs
    }

    /// Retry policy for the layer above the routing core
    #[inline]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[derive(Deserialize)]
struct RawPipelineStepConfig {
    step_name: String,
    step_type: StepType,
    processor: ProcessorInfo,
    #[serde(default)]
    kafka_inputs: Vec<KafkaInputDefinition>,
    #[serde(default)]
    outputs: BTreeMap<String, OutputTarget>,
    #[serde(default)]
    retry: RetryPolicy,
}

impl TryFrom<RawPipelineStepConfig> for PipelineStepConfig {
    type Error = ConfigError;

    fn try_from(raw: RawPipelineStepConfig) -> Result<Self> {
        let step = PipelineStepConfig::new(raw.step_name, raw.step_type, raw.processor)?;
        Ok(Self {
            kafka_inputs: raw.kafka_inputs,
            outputs: raw.outputs,
            retry: raw.retry,
            ..step
        })
    }
}
