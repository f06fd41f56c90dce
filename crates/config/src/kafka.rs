//! Kafka transport and input configuration
//!
//! `KafkaTransportConfig` describes how a step publishes to a downstream
//! topic; `KafkaInputDefinition` describes which topics a step consumes.
//! Both apply documented defaults for anything the pipeline author leaves
//! out, so a minimal config just works.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default partition-key field: the document id carried by the stream
pub const DEFAULT_PARTITION_KEY_FIELD: &str = "pipedocId";

/// Default producer compression
pub const DEFAULT_COMPRESSION_TYPE: &str = "snappy";

/// Default producer batch size in bytes
pub const DEFAULT_BATCH_SIZE: i32 = 16384;

/// Default producer linger in milliseconds
pub const DEFAULT_LINGER_MS: i32 = 10;

/// Suffix appended to a topic to derive its dead-letter-queue topic
pub const DLQ_SUFFIX: &str = ".dlq";

/// Kafka publish configuration for one output
///
/// The topic is optional: when unset, the standard
/// `"<pipeline>.<step>.input"` name is synthesized at routing time. An
/// explicitly configured topic is custom forwarding and must pass the
/// topic policy before any send.
///
/// # Example
///
/// ```toml
/// topic = "backup-topic"
/// compression_type = "lz4"
/// batch_size = 32768
///
/// [producer_properties]
/// "acks" = "all"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawKafkaTransportConfig")]
pub struct KafkaTransportConfig {
    topic: Option<String>,
    partition_key_field: String,
    compression_type: String,
    batch_size: i32,
    linger_ms: i32,
    producer_properties: BTreeMap<String, String>,
}

impl KafkaTransportConfig {
    /// Create a config, applying documented defaults to anything unset
    ///
    /// A blank topic or partition-key field, a batch size ≤ 0, a negative
    /// linger, and a blank compression type all fall back to their
    /// defaults rather than erroring.
    pub fn new(
        topic: Option<String>,
        partition_key_field: Option<String>,
        compression_type: Option<String>,
        batch_size: Option<i32>,
        linger_ms: Option<i32>,
        producer_properties: Option<BTreeMap<String, String>>,
    ) -> Self {
        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        Self {
            topic: non_blank(topic),
            partition_key_field: non_blank(partition_key_field)
                .unwrap_or_else(|| DEFAULT_PARTITION_KEY_FIELD.to_string()),
            compression_type: non_blank(compression_type)
                .unwrap_or_else(|| DEFAULT_COMPRESSION_TYPE.to_string()),
            batch_size: batch_size.filter(|b| *b > 0).unwrap_or(DEFAULT_BATCH_SIZE),
            linger_ms: linger_ms.filter(|l| *l >= 0).unwrap_or(DEFAULT_LINGER_MS),
            producer_properties: producer_properties.unwrap_or_default(),
        }
    }

    /// Create a config publishing to an explicit topic, all else defaulted
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self::new(Some(topic.into()), None, None, None, None, None)
    }

    /// Create a config relying on the synthesized standard topic name
    pub fn conventional() -> Self {
        Self::new(None, None, None, None, None, None)
    }

    /// Explicitly configured topic, if any
    #[inline]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Field of the stream used as the record partition key
    #[inline]
    pub fn partition_key_field(&self) -> &str {
        &self.partition_key_field
    }

    /// Producer compression type
    #[inline]
    pub fn compression_type(&self) -> &str {
        &self.compression_type
    }

    /// Producer batch size in bytes
    #[inline]
    pub fn batch_size(&self) -> i32 {
        self.batch_size
    }

    /// Producer linger in milliseconds
    #[inline]
    pub fn linger_ms(&self) -> i32 {
        self.linger_ms
    }

    /// Free-form producer properties as configured
    #[inline]
    pub fn producer_properties(&self) -> &BTreeMap<String, String> {
        &self.producer_properties
    }

    /// Dead-letter-queue topic derived from the configured topic
    ///
    /// `None` when no topic is configured.
    pub fn dlq_topic(&self) -> Option<String> {
        self.topic.as_ref().map(|t| format!("{t}{DLQ_SUFFIX}"))
    }

    /// Merged producer-properties view
    ///
    /// The three base keys (`compression.type`, `batch.size`, `linger.ms`)
    /// are merged with the explicit properties; explicit keys win on
    /// conflict. The returned map is an owned snapshot; mutating it
    /// cannot alter this config.
    pub fn all_producer_properties(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        merged.insert("compression.type".to_string(), self.compression_type.clone());
        merged.insert("batch.size".to_string(), self.batch_size.to_string());
        merged.insert("linger.ms".to_string(), self.linger_ms.to_string());
        for (key, value) in &self.producer_properties {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

#[derive(Deserialize)]
struct RawKafkaTransportConfig {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    partition_key_field: Option<String>,
    #[serde(default)]
    compression_type: Option<String>,
    #[serde(default)]
    batch_size: Option<i32>,
    #[serde(default)]
    linger_ms: Option<i32>,
    #[serde(default)]
    producer_properties: Option<BTreeMap<String, String>>,
}

impl From<RawKafkaTransportConfig> for KafkaTransportConfig {
    fn from(raw: RawKafkaTransportConfig) -> Self {
        Self::new(
            raw.topic,
            raw.partition_key_field,
            raw.compression_type,
            raw.batch_size,
            raw.linger_ms,
            raw.producer_properties,
        )
    }
}

/// Kafka consume configuration for one step
///
/// A step may listen on several topics (fan-in); all of them share the
/// consumer group. When no group id is configured the engine synthesizes
/// one from the pipeline and step names.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawKafkaInputDefinition")]
pub struct KafkaInputDefinition {
    listen_topics: Vec<String>,
    consumer_group_id: Option<String>,
    consumer_properties: BTreeMap<String, String>,
}

impl KafkaInputDefinition {
    /// Create an input definition
    ///
    /// # Errors
    ///
    /// Returns an error if the topic list is empty or any entry is blank.
    pub fn new(
        listen_topics: Vec<String>,
        consumer_group_id: Option<String>,
        consumer_properties: Option<BTreeMap<String, String>>,
    ) -> Result<Self> {
        if listen_topics.is_empty() {
            return Err(ConfigError::EmptyTopics);
        }
        for (index, topic) in listen_topics.iter().enumerate() {
            if topic.trim().is_empty() {
                return Err(ConfigError::BlankTopic { index });
            }
        }

        Ok(Self {
            listen_topics,
            consumer_group_id: consumer_group_id.filter(|g| !g.trim().is_empty()),
            consumer_properties: consumer_properties.unwrap_or_default(),
        })
    }

    /// Topics this step consumes
    #[inline]
    pub fn listen_topics(&self) -> &[String] {
        &self.listen_topics
    }

    /// Configured consumer group id, if any
    #[inline]
    pub fn consumer_group_id(&self) -> Option<&str> {
        self.consumer_group_id.as_deref()
    }

    /// Free-form consumer properties
    #[inline]
    pub fn consumer_properties(&self) -> &BTreeMap<String, String> {
        &self.consumer_properties
    }

    /// Consumer group to use: the configured id, or the synthesized
    /// `"<pipeline>.<step>"` convention when none is configured
    pub fn consumer_group_or_default(&self, pipeline_name: &str, step_name: &str) -> String {
        match &self.consumer_group_id {
            Some(group) => group.clone(),
            None => format!("{pipeline_name}.{step_name}"),
        }
    }
}

#[derive(Deserialize)]
struct RawKafkaInputDefinition {
    listen_topics: Vec<String>,
    #[serde(default)]
    consumer_group_id: Option<String>,
    #[serde(default)]
    consumer_properties: Option<BTreeMap<String, String>>,
}

impl TryFrom<RawKafkaInputDefinition> for KafkaInputDefinition {
    type Error = ConfigError;

    fn try_from(raw: RawKafkaInputDefinition) -> Result<Self> {
        KafkaInputDefinition::new(raw.listen_topics, raw.consumer_group_id, raw.consumer_properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = KafkaTransportConfig::new(None, None, None, None, None, None);
        assert_eq!(config.topic(), None);
        assert_eq!(config.partition_key_field(), "pipedocId");
        assert_eq!(config.compression_type(), "snappy");
        assert_eq!(config.batch_size(), 16384);
        assert_eq!(config.linger_ms(), 10);
        assert!(config.producer_properties().is_empty());
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let config = KafkaTransportConfig::new(
            Some("t".into()),
            Some("  ".into()),
            Some("".into()),
            Some(0),
            Some(-1),
            None,
        );
        assert_eq!(config.partition_key_field(), "pipedocId");
        assert_eq!(config.compression_type(), "snappy");
        assert_eq!(config.batch_size(), 16384);
        assert_eq!(config.linger_ms(), 10);
    }

    #[test]
    fn test_explicit_values_kept() {
        let config = KafkaTransportConfig::new(
            Some("backup".into()),
            Some("streamId".into()),
            Some("lz4".into()),
            Some(32768),
            Some(0),
            None,
        );
        assert_eq!(config.topic(), Some("backup"));
        assert_eq!(config.partition_key_field(), "streamId");
        assert_eq!(config.compression_type(), "lz4");
        assert_eq!(config.batch_size(), 32768);
        // Zero linger is a valid explicit choice
        assert_eq!(config.linger_ms(), 0);
    }

    #[test]
    fn test_dlq_topic_derived() {
        assert_eq!(
            KafkaTransportConfig::for_topic("t").dlq_topic(),
            Some("t.dlq".to_string())
        );
        assert_eq!(KafkaTransportConfig::conventional().dlq_topic(), None);
    }

    #[test]
    fn test_blank_topic_treated_as_unset() {
        let config = KafkaTransportConfig::new(Some("   ".into()), None, None, None, None, None);
        assert_eq!(config.topic(), None);
        assert_eq!(config.dlq_topic(), None);
    }

    #[test]
    fn test_merged_producer_properties() {
        let mut explicit = BTreeMap::new();
        explicit.insert("compression.type".to_string(), "gzip".to_string());
        explicit.insert("acks".to_string(), "all".to_string());

        let config = KafkaTransportConfig::new(
            Some("t".into()),
            None,
            None,
            Some(1024),
            Some(5),
            Some(explicit),
        );

        let merged = config.all_producer_properties();
        // Explicit keys win on conflict
        assert_eq!(merged.get("compression.type").map(String::as_str), Some("gzip"));
        // Base keys fill in the rest
        assert_eq!(merged.get("batch.size").map(String::as_str), Some("1024"));
        assert_eq!(merged.get("linger.ms").map(String::as_str), Some("5"));
        assert_eq!(merged.get("acks").map(String::as_str), Some("all"));
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_merged_view_is_a_snapshot() {
        let config = KafkaTransportConfig::for_topic("t");
        let mut merged = config.all_producer_properties();
        merged.insert("mutated".to_string(), "yes".to_string());

        // The config is unaffected by mutation of the returned map
        assert!(!config.all_producer_properties().contains_key("mutated"));
    }

    #[test]
    fn test_input_rejects_empty_topic_list() {
        let err = KafkaInputDefinition::new(Vec::new(), None, None).unwrap_err();
        assert!(err.to_string().contains("at least one topic"));
    }

    #[test]
    fn test_input_rejects_blank_topic() {
        let err = KafkaInputDefinition::new(
            vec!["good".to_string(), "  ".to_string()],
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_input_accessors() {
        let input = KafkaInputDefinition::new(
            vec!["a.input".to_string(), "b.input".to_string()],
            Some("custom-group".to_string()),
            None,
        )
        .unwrap();

        assert_eq!(input.listen_topics().len(), 2);
        assert_eq!(input.consumer_group_id(), Some("custom-group"));
        assert_eq!(
            input.consumer_group_or_default("search", "chunker"),
            "custom-group"
        );
    }

    #[test]
    fn test_consumer_group_synthesized() {
        let input =
            KafkaInputDefinition::new(vec!["a.input".to_string()], None, None).unwrap();
        assert_eq!(input.consumer_group_id(), None);
        assert_eq!(
            input.consumer_group_or_default("search", "chunker"),
            "search.chunker"
        );
    }

    #[test]
    fn test_deserialize_transport_config() {
        let toml = r#"
topic = "backup-topic"
batch_size = 0

[producer_properties]
"acks" = "all"
"#;
        let config: KafkaTransportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.topic(), Some("backup-topic"));
        // Out-of-range batch size falls back even through serde
        assert_eq!(config.batch_size(), 16384);
        assert_eq!(
            config.producer_properties().get("acks").map(String::as_str),
            Some("all")
        );
    }

    #[test]
    fn test_deserialize_input_rejects_blank() {
        let toml = r#"
listen_topics = ["good", ""]
"#;
        let result: std::result::Result<KafkaInputDefinition, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
