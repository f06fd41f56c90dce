//! Health-aware service discovery
//!
//! `RegistryDiscovery` sits between the router's transport handlers and
//! the module registry: it filters out unhealthy registrations (including
//! zombie instances whose backing process is gone but whose registration
//! lingers) and balances across the survivors.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{DiscoveryError, Result};
use crate::instance::ServiceInstance;
use crate::registry::ModuleRegistry;

/// Resolution of logical service names to live instances
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// Resolve one live, healthy instance of a service
    ///
    /// This is the per-request hot path. Selection is load-balanced;
    /// lookups are bounded by the underlying registry client's own
    /// timeout, nothing extra is enforced here.
    ///
    /// # Errors
    ///
    /// Fails with [`DiscoveryError::NoInstanceFound`] when no healthy
    /// instance is registered. Never synthesizes a fallback instance.
    async fn discover_service(&self, service_name: &str) -> Result<ServiceInstance>;

    /// List every known instance regardless of health
    ///
    /// Diagnostics path: may return an empty list, never fails solely
    /// because nothing is registered.
    async fn discover_all_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>>;
}

/// Registry-backed discovery with round-robin selection
pub struct RegistryDiscovery {
    registry: Arc<dyn ModuleRegistry>,

    /// Per-service round-robin cursors
    ///
    /// Cursors only advance on successful selection, so the map stays
    /// small (one entry per routed service) and read-mostly.
    cursors: Mutex<HashMap<String, usize>>,
}

impl RegistryDiscovery {
    /// Create discovery over a registry
    pub fn new(registry: Arc<dyn ModuleRegistry>) -> Self {
        Self {
            registry,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    fn next_index(&self, service_name: &str, len: usize) -> usize {
        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(service_name.to_string()).or_insert(0);
        let index = *cursor % len;
        *cursor = cursor.wrapping_add(1);
        index
    }
}

#[async_trait]
impl ServiceDiscovery for RegistryDiscovery {
    async fn discover_service(&self, service_name: &str) -> Result<ServiceInstance> {
        let healthy: Vec<ServiceInstance> = self
            .registry
            .list_instances(service_name)
            .await?
            .into_iter()
            .filter(ServiceInstance::is_healthy)
            .collect();

        if healthy.is_empty() {
            tracing::warn!(
                service = %service_name,
                "no healthy instance registered"
            );
            return Err(DiscoveryError::no_instance(service_name));
        }

        let index = self.next_index(service_name, healthy.len());
        let instance = healthy[index].clone();
        tracing::debug!(
            service = %service_name,
            instance = %instance,
            healthy_count = healthy.len(),
            "resolved service instance"
        );
        Ok(instance)
    }

    async fn discover_all_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        self.registry.list_instances(service_name).await
    }
}

impl std::fmt::Debug for RegistryDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryDiscovery")
            .field("tracked_services", &self.cursors.lock().len())
            .finish()
    }
}
