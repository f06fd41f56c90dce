//! Output fan-out targets
//!
//! Each step declares zero or more named outputs. An output names the
//! downstream step, the transport used to reach it, and exactly the
//! transport config matching the declared transport type. The invariant is
//! enforced at construction, so the router never has to second-guess which
//! config is present.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::kafka::KafkaTransportConfig;

/// Wire mechanism used to deliver a step's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportType {
    /// Synchronous gRPC call to a remote module or engine
    Grpc,
    /// Fire-and-forget publish to a Kafka topic
    Kafka,
    /// In-process delivery to a locally registered processor
    Internal,
}

impl TransportType {
    /// Get the transport type name (for logging/metrics)
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Kafka => "kafka",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// gRPC transport configuration for one output
///
/// Names the logical service to resolve via discovery, plus free-form
/// client properties (deadline overrides, load-balancing hints) passed
/// through to the client factory.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawGrpcTransportConfig")]
pub struct GrpcTransportConfig {
    service_name: String,
    client_properties: BTreeMap<String, String>,
}

impl GrpcTransportConfig {
    /// Create a new gRPC transport config
    ///
    /// # Errors
    ///
    /// Returns an error if the service name is blank.
    pub fn new(service_name: impl Into<String>) -> Result<Self> {
        let service_name = service_name.into();
        if service_name.trim().is_empty() {
            return Err(ConfigError::missing_field(
                "grpc transport",
                service_name,
                "service_name",
            ));
        }
        Ok(Self {
            service_name,
            client_properties: BTreeMap::new(),
        })
    }

    /// Attach a client property
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.client_properties.insert(key.into(), value.into());
        self
    }

    /// Logical service name resolved through discovery
    #[inline]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Free-form client properties
    #[inline]
    pub fn client_properties(&self) -> &BTreeMap<String, String> {
        &self.client_properties
    }
}

#[derive(Deserialize)]
struct RawGrpcTransportConfig {
    service_name: String,
    #[serde(default)]
    client_properties: BTreeMap<String, String>,
}

impl TryFrom<RawGrpcTransportConfig> for GrpcTransportConfig {
    type Error = ConfigError;

    fn try_from(raw: RawGrpcTransportConfig) -> Result<Self> {
        let mut config = GrpcTransportConfig::new(raw.service_name)?;
        config.client_properties = raw.client_properties;
        Ok(config)
    }
}

/// One named output of a step
///
/// # Invariant
///
/// The transport config present must match the declared transport type:
/// `Grpc` requires a gRPC config and forbids a Kafka config, `Kafka` the
/// reverse, `Internal` forbids both.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawOutputTarget")]
pub struct OutputTarget {
    target_step_name: String,
    transport_type: TransportType,
    grpc_transport: Option<GrpcTransportConfig>,
    kafka_transport: Option<KafkaTransportConfig>,
}

impl OutputTarget {
    /// Create a new output target, enforcing the transport/config invariant
    ///
    /// # Errors
    ///
    /// Returns an error if the target step name is blank or the provided
    /// transport configs do not match the declared transport type.
    pub fn new(
        target_step_name: impl Into<String>,
        transport_type: TransportType,
        grpc_transport: Option<GrpcTransportConfig>,
        kafka_transport: Option<KafkaTransportConfig>,
    ) -> Result<Self> {
        let target_step_name = target_step_name.into();
        if target_step_name.trim().is_empty() {
            return Err(ConfigError::missing_field(
                "output",
                target_step_name,
                "target_step_name",
            ));
        }

        let mismatch = |detail: &'static str| ConfigError::TransportMismatch {
            target: target_step_name.clone(),
            transport: transport_type,
            detail,
        };

        match transport_type {
            TransportType::Grpc => {
                if grpc_transport.is_none() {
                    return Err(mismatch("no grpc config is present"));
                }
                if kafka_transport.is_some() {
                    return Err(mismatch("a kafka config is present"));
                }
            }
            TransportType::Kafka => {
                if kafka_transport.is_none() {
                    return Err(mismatch("no kafka config is present"));
                }
                if grpc_transport.is_some() {
                    return Err(mismatch("a grpc config is present"));
                }
            }
            TransportType::Internal => {
                if grpc_transport.is_some() || kafka_transport.is_some() {
                    return Err(mismatch("a transport config is present"));
                }
            }
        }

        Ok(Self {
            target_step_name,
            transport_type,
            grpc_transport,
            kafka_transport,
        })
    }

    /// Create a gRPC output
    pub fn grpc(target_step_name: impl Into<String>, config: GrpcTransportConfig) -> Result<Self> {
        Self::new(target_step_name, TransportType::Grpc, Some(config), None)
    }

    /// Create a Kafka output
    pub fn kafka(
        target_step_name: impl Into<String>,
        config: KafkaTransportConfig,
    ) -> Result<Self> {
        Self::new(target_step_name, TransportType::Kafka, None, Some(config))
    }

    /// Create an internal (in-process) output
    pub fn internal(target_step_name: impl Into<String>) -> Result<Self> {
        Self::new(target_step_name, TransportType::Internal, None, None)
    }

    /// Downstream step this output delivers to
    #[inline]
    pub fn target_step_name(&self) -> &str {
        &self.target_step_name
    }

    /// Declared transport type
    #[inline]
    pub fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    /// gRPC transport config (present iff the transport type is `Grpc`)
    #[inline]
    pub fn grpc_transport(&self) -> Option<&GrpcTransportConfig> {
        self.grpc_transport.as_ref()
    }

    /// Kafka transport config (present iff the transport type is `Kafka`)
    #[inline]
    pub fn kafka_transport(&self) -> Option<&KafkaTransportConfig> {
        self.kafka_transport.as_ref()
    }
}

#[derive(Deserialize)]
struct RawOutputTarget {
    target_step_name: String,
    transport_type: TransportType,
    #[serde(default)]
    grpc_transport: Option<GrpcTransportConfig>,
    #[serde(default)]
    kafka_transport: Option<KafkaTransportConfig>,
}

impl TryFrom<RawOutputTarget> for OutputTarget {
    type Error = ConfigError;

    fn try_from(raw: RawOutputTarget) -> Result<Self> {
        OutputTarget::new(
            raw.target_step_name,
            raw.transport_type,
            raw.grpc_transport,
            raw.kafka_transport,
        )
    }
}
