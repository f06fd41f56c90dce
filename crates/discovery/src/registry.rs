//! Module registry contract
//!
//! The registry is the external source of truth for which module
//! instances exist, their health, and their metadata. The routing core
//! consults it but does not own its storage; any backend (Consul-like
//! catalog, control-plane cache) can sit behind the trait.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::instance::{HealthStatus, ServiceInstance};

/// Read-side contract of the module registry
#[async_trait]
pub trait ModuleRegistry: Send + Sync {
    /// List every known instance of a service, healthy or not
    ///
    /// An unknown service yields an empty list, not an error.
    async fn list_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>>;

    /// Aggregate health of a service
    async fn get_health(&self, service_name: &str) -> Result<HealthStatus>;
}

/// In-memory registry seeded from an explicitly provided instance list
///
/// Replaces registration-time service scanning with a static list handed
/// to the composition root. Also the registry used by tests.
#[derive(Debug, Default)]
pub struct StaticModuleRegistry {
    instances: RwLock<HashMap<String, Vec<ServiceInstance>>>,
}

impl StaticModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from an instance list
    pub fn with_instances(instances: impl IntoIterator<Item = ServiceInstance>) -> Self {
        let registry = Self::new();
        for instance in instances {
            registry.register(instance);
        }
        registry
    }

    /// Register one instance under its service name
    pub fn register(&self, instance: ServiceInstance) {
        self.instances
            .write()
            .entry(instance.service_name().to_string())
            .or_default()
            .push(instance);
    }

    /// Remove every instance of a service
    pub fn deregister_service(&self, service_name: &str) {
        self.instances.write().remove(service_name);
    }

    /// Number of registered services
    pub fn service_count(&self) -> usize {
        self.instances.read().len()
    }
}

#[async_trait]
impl ModuleRegistry for StaticModuleRegistry {
    async fn list_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        Ok(self
            .instances
            .read()
            .get(service_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_health(&self, service_name: &str) -> Result<HealthStatus> {
        let instances = self.instances.read();
        let status = match instances.get(service_name) {
            None => HealthStatus::Unknown,
            Some(list) if list.is_empty() => HealthStatus::Unknown,
            Some(list) if list.iter().any(ServiceInstance::is_healthy) => HealthStatus::Passing,
            Some(_) => HealthStatus::Critical,
        };
        Ok(status)
    }
}
