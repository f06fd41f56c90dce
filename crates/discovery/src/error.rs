//! Discovery error types

use thiserror::Error;

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur while resolving a service
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No healthy instance is registered for the service
    #[error("no healthy instance found for service '{service_name}'")]
    NoInstanceFound {
        /// The unresolvable service
        service_name: String,
    },

    /// The underlying registry failed or was unreachable
    #[error("registry lookup failed for service '{service_name}': {source}")]
    Registry {
        /// The service being looked up
        service_name: String,
        /// Underlying registry error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DiscoveryError {
    /// Create a NoInstanceFound error
    #[inline]
    pub fn no_instance(service_name: impl Into<String>) -> Self {
        Self::NoInstanceFound {
            service_name: service_name.into(),
        }
    }

    /// Create a Registry error
    #[inline]
    pub fn registry(
        service_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Registry {
            service_name: service_name.into(),
            source: source.into(),
        }
    }
}
