//! Outbound gRPC channel cache
//!
//! Channels are keyed by `host:port` and reused across requests; two
//! callers racing to resolve the same endpoint get the same channel
//! because get-or-create runs under one lock. Channels are lazy: the TCP
//! connection is established on first use and re-established by tonic as
//! needed afterward.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};

use crate::error::{Result, TransportError};

/// Client property selecting the connect timeout, in milliseconds
const PROP_CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";

/// Client property selecting the per-request timeout, in milliseconds
const PROP_REQUEST_TIMEOUT_MS: &str = "request_timeout_ms";

/// Cache of outbound gRPC channels, keyed by endpoint
#[derive(Debug, Default)]
pub struct GrpcClientFactory {
    channels: Mutex<HashMap<String, Channel>>,
}

impl GrpcClientFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the channel for an endpoint
    ///
    /// # Errors
    ///
    /// Fails only when the endpoint cannot be expressed as a URI; actual
    /// connection errors surface on first use of the channel.
    pub async fn get_client(&self, host: &str, port: u16) -> Result<Channel> {
        self.get_client_configured(host, port, &Default::default()).await
    }

    /// Get or create the channel for an endpoint, applying client properties
    ///
    /// Recognized properties (`connect_timeout_ms`, `request_timeout_ms`)
    /// only take effect when the channel is first created; a cache hit
    /// returns the existing channel unchanged, since one endpoint never
    /// gets a second connection.
    pub async fn get_client_configured(
        &self,
        host: &str,
        port: u16,
        properties: &std::collections::BTreeMap<String, String>,
    ) -> Result<Channel> {
        let key = format!("{host}:{port}");

        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(&key) {
            return Ok(channel.clone());
        }

        let mut endpoint = Endpoint::from_shared(format!("http://{key}")).map_err(|source| {
            TransportError::Connection {
                endpoint: key.clone(),
                source,
            }
        })?;

        if let Some(ms) = parse_ms(properties, PROP_CONNECT_TIMEOUT_MS, &key) {
            endpoint = endpoint.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_ms(properties, PROP_REQUEST_TIMEOUT_MS, &key) {
            endpoint = endpoint.timeout(Duration::from_millis(ms));
        }

        let channel = endpoint.connect_lazy();
        channels.insert(key.clone(), channel.clone());
        tracing::debug!(endpoint = %key, "opened grpc channel");
        Ok(channel)
    }

    /// Number of cached channels
    pub async fn client_count(&self) -> usize {
        self.channels.lock().await.len()
    }

    /// Drop every cached channel
    ///
    /// Dropping a channel tears its connection down; each endpoint is
    /// logged individually so a problem with one cannot hide the rest.
    pub async fn shutdown(&self) {
        let mut channels = self.channels.lock().await;
        for (endpoint, _channel) in channels.drain() {
            tracing::info!(endpoint = %endpoint, "closing grpc channel");
        }
    }
}

fn parse_ms(
    properties: &std::collections::BTreeMap<String, String>,
    key: &str,
    endpoint: &str,
) -> Option<u64> {
    let raw = properties.get(key)?;
    match raw.parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            tracing::warn!(
                endpoint = %endpoint,
                property = %key,
                value = %raw,
                "ignoring unparsable client property"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_client_is_cached_per_endpoint() {
        let factory = GrpcClientFactory::new();

        let _first = factory.get_client("localhost", 50051).await.unwrap();
        let _second = factory.get_client("localhost", 50051).await.unwrap();
        assert_eq!(factory.client_count().await, 1);

        let _third = factory.get_client("localhost", 50052).await.unwrap();
        assert_eq!(factory.client_count().await, 2);
    }

    #[tokio::test]
    async fn test_racing_callers_share_one_channel() {
        let factory = std::sync::Arc::new(GrpcClientFactory::new());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let factory = std::sync::Arc::clone(&factory);
                tokio::spawn(async move { factory.get_client("localhost", 50051).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(factory.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_client_properties_applied_on_miss() {
        let factory = GrpcClientFactory::new();
        let mut properties = BTreeMap::new();
        properties.insert("connect_timeout_ms".to_string(), "250".to_string());
        properties.insert("request_timeout_ms".to_string(), "not-a-number".to_string());

        // Unparsable properties are ignored, not fatal
        factory
            .get_client_configured("localhost", 50051, &properties)
            .await
            .unwrap();
        assert_eq!(factory.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_cache() {
        let factory = GrpcClientFactory::new();
        factory.get_client("localhost", 50051).await.unwrap();
        factory.get_client("localhost", 50052).await.unwrap();

        factory.shutdown().await;
        assert_eq!(factory.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected() {
        let factory = GrpcClientFactory::new();
        let err = factory.get_client("bad host", 50051).await.unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));
    }
}
