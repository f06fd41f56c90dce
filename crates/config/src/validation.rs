//! Pipeline-level validation
//!
//! Individual types enforce their own invariants at construction; this
//! module checks the cross-references between steps: every routed output
//! must point at a step the pipeline actually defines. Custom-topic Kafka
//! outputs are exempt: an explicit topic is forwarding out of the
//! pipeline, subject to the topic policy at routing time instead.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::step::PipelineStepConfig;

/// A named pipeline: an ordered set of step configurations
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawPipelineConfig")]
pub struct PipelineConfig {
    pipeline_name: String,
    steps: BTreeMap<String, PipelineStepConfig>,
}

impl PipelineConfig {
    /// Create an empty pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline name is blank.
    pub fn new(pipeline_name: impl Into<String>) -> Result<Self> {
        let pipeline_name = pipeline_name.into();
        if pipeline_name.trim().is_empty() {
            return Err(ConfigError::missing_field(
                "pipeline",
                pipeline_name,
                "pipeline_name",
            ));
        }
        Ok(Self {
            pipeline_name,
            steps: BTreeMap::new(),
        })
    }

    /// Add a step, keyed by its own step name
    ///
    /// # Errors
    ///
    /// Returns an error if a step with the same name is already present.
    pub fn with_step(mut self, step: PipelineStepConfig) -> Result<Self> {
        if self.steps.contains_key(step.step_name()) {
            return Err(ConfigError::DuplicateStep {
                pipeline: self.pipeline_name.clone(),
                step: step.step_name().to_string(),
            });
        }
        self.steps.insert(step.step_name().to_string(), step);
        Ok(self)
    }

    /// Pipeline name
    #[inline]
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// Look up a step by name
    #[inline]
    pub fn step(&self, name: &str) -> Option<&PipelineStepConfig> {
        self.steps.get(name)
    }

    /// All steps, ordered by name
    #[inline]
    pub fn steps(&self) -> &BTreeMap<String, PipelineStepConfig> {
        &self.steps
    }

    /// Validate cross-references between steps
    ///
    /// # Errors
    ///
    /// Returns the first output whose target step does not exist. Outputs
    /// publishing to an explicitly configured Kafka topic are skipped.
    pub fn validate(&self) -> Result<()> {
        for (step_name, step) in &self.steps {
            for (output_name, output) in step.outputs() {
                let custom_topic = output
                    .kafka_transport()
                    .is_some_and(|k| k.topic().is_some());
                if custom_topic {
                    continue;
                }
                if !self.steps.contains_key(output.target_step_name()) {
                    return Err(ConfigError::UnknownTargetStep {
                        pipeline: self.pipeline_name.clone(),
                        step: step_name.clone(),
                        output: output_name.clone(),
                        target: output.target_step_name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawPipelineConfig {
    pipeline_name: String,
    #[serde(default)]
    steps: BTreeMap<String, PipelineStepConfig>,
}

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(raw: RawPipelineConfig) -> Result<Self> {
        let mut pipeline = PipelineConfig::new(raw.pipeline_name)?;
        for (key, step) in raw.steps {
            if key != step.step_name() {
                return Err(ConfigError::invalid_value(
                    "pipeline",
                    pipeline.pipeline_name.clone(),
                    "steps",
                    format!("key '{key}' does not match step name '{}'", step.step_name()),
                ));
            }
            pipeline = pipeline.with_step(step)?;
        }
        pipeline.validate()?;
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::KafkaTransportConfig;
    use crate::output::OutputTarget;
    use crate::step::{ProcessorInfo, StepType};

    fn step(name: &str) -> PipelineStepConfig {
        PipelineStepConfig::new(
            name,
            StepType::Pipeline,
            ProcessorInfo::grpc(format!("{name}-service")).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_requires_name() {
        assert!(PipelineConfig::new("").is_err());
        assert!(PipelineConfig::new("search-indexing").is_ok());
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let result = PipelineConfig::new("search")
            .unwrap()
            .with_step(step("parser"))
            .unwrap()
            .with_step(step("parser"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_accepts_resolved_targets() {
        let parser = step("parser").with_output(
            "default",
            OutputTarget::kafka("chunker", KafkaTransportConfig::conventional()).unwrap(),
        );

        let pipeline = PipelineConfig::new("search")
            .unwrap()
            .with_step(parser)
            .unwrap()
            .with_step(step("chunker"))
            .unwrap();

        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_target() {
        let parser = step("parser").with_output(
            "default",
            OutputTarget::kafka("missing", KafkaTransportConfig::conventional()).unwrap(),
        );

        let pipeline = PipelineConfig::new("search").unwrap().with_step(parser).unwrap();
        let err = pipeline.validate().unwrap_err();
        assert!(err.to_string().contains("unknown step 'missing'"));
    }

    #[test]
    fn test_validate_skips_custom_topic_outputs() {
        // An explicit topic forwards outside the pipeline; the target step
        // is not required to exist here.
        let parser = step("parser").with_output(
            "backup",
            OutputTarget::kafka("external-archive", KafkaTransportConfig::for_topic("backup-topic"))
                .unwrap(),
        );

        let pipeline = PipelineConfig::new("search").unwrap().with_step(parser).unwrap();
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_deserialize_pipeline() {
        let toml = r#"
pipeline_name = "search-indexing"

[steps.parser]
step_name = "parser"
step_type = "INITIAL_PIPELINE"

[steps.parser.processor]
grpc_service_name = "parser-service"

[steps.parser.outputs.default]
target_step_name = "chunker"
transport_type = "KAFKA"

[steps.parser.outputs.default.kafka_transport]

[steps.chunker]
step_name = "chunker"
step_type = "SINK"

[steps.chunker.processor]
grpc_service_name = "chunker-service"
"#;
        let pipeline: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(pipeline.pipeline_name(), "search-indexing");
        assert_eq!(pipeline.steps().len(), 2);
        assert!(pipeline.step("parser").is_some());
    }

    #[test]
    fn test_deserialize_rejects_key_mismatch() {
        let toml = r#"
pipeline_name = "search"

[steps.wrong-key]
step_name = "parser"
step_type = "PIPELINE"

[steps.wrong-key.processor]
grpc_service_name = "parser-service"
"#;
        let result: std::result::Result<PipelineConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
