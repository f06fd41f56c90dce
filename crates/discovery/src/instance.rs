//! Service instance types
//!
//! A `ServiceInstance` is what the registry knows about one running copy
//! of a module: where it is, whether it is passing health checks, and its
//! free-form metadata. The `service-type` metadata key decides which RPC
//! contract applies to the instance.

use std::collections::HashMap;
use std::fmt;

/// Metadata key carrying the registered service kind
pub const SERVICE_TYPE_METADATA_KEY: &str = "service-type";

/// Metadata value marking an instance as a peer engine
pub const SERVICE_TYPE_ENGINE: &str = "ENGINE";

/// What contract a discovered instance speaks
///
/// Derived once from registry metadata at discovery time. Anything that
/// is not unambiguously an engine is treated as a leaf module, so a
/// failed or garbled metadata lookup can never escalate a target to the
/// engine contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceKind {
    /// Leaf module: speaks the process-one-document contract
    #[default]
    Module,
    /// Peer engine: speaks the process-one-stream-hop contract
    Engine,
}

impl ServiceKind {
    /// Derive the kind from an instance's metadata map
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Self {
        match metadata.get(SERVICE_TYPE_METADATA_KEY) {
            Some(value) if value == SERVICE_TYPE_ENGINE => Self::Engine,
            _ => Self::Module,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Module => "module",
            Self::Engine => "engine",
        };
        f.write_str(name)
    }
}

/// Health of a service as reported by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// At least one instance is passing health checks
    Passing,
    /// Instances exist but none is passing
    Critical,
    /// No instances are registered at all
    Unknown,
}

/// One registered instance of a service
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    instance_id: String,
    service_name: String,
    host: String,
    port: u16,
    healthy: bool,
    kind: ServiceKind,
    metadata: HashMap<String, String>,
}

impl ServiceInstance {
    /// Create an instance record; the kind is derived from the metadata
    pub fn new(
        instance_id: impl Into<String>,
        service_name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        healthy: bool,
        metadata: HashMap<String, String>,
    ) -> Self {
        let kind = ServiceKind::from_metadata(&metadata);
        Self {
            instance_id: instance_id.into(),
            service_name: service_name.into(),
            host: host.into(),
            port,
            healthy,
            kind,
            metadata,
        }
    }

    /// Convenience constructor for a healthy leaf module
    pub fn module(
        instance_id: impl Into<String>,
        service_name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self::new(instance_id, service_name, host, port, true, HashMap::new())
    }

    /// Convenience constructor for a healthy peer engine
    pub fn engine(
        instance_id: impl Into<String>,
        service_name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        let metadata = HashMap::from([(
            SERVICE_TYPE_METADATA_KEY.to_string(),
            SERVICE_TYPE_ENGINE.to_string(),
        )]);
        Self::new(instance_id, service_name, host, port, true, metadata)
    }

    /// Mark this instance unhealthy
    #[must_use]
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Registry-assigned instance id
    #[inline]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Logical service this instance belongs to
    #[inline]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Hostname or IP
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port
    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the instance is currently passing health checks
    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Contract this instance speaks
    #[inline]
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Free-form registration metadata
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// `host:port` form for cache keys and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{} ({})",
            self.service_name, self.host, self.port, self.kind
        )
    }
}
