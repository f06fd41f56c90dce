//! Routing observability events
//!
//! The router publishes an event before and after every per-output
//! attempt. Events are a monitoring side effect only: sinks are invoked
//! synchronously, return nothing, and cannot affect control flow or
//! ordering. The sink is supplied by the caller at composition time.

use pipework_config::TransportType;

/// One routing lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingEvent {
    /// An output attempt is about to start
    Started {
        /// Stream being routed
        stream_id: String,
        /// Step whose output is being routed
        step_name: String,
        /// Target of the output
        target_step_name: String,
        /// Transport of the output
        transport_type: TransportType,
    },

    /// An output attempt completed successfully
    Completed {
        /// Stream being routed
        stream_id: String,
        /// Step whose output was routed
        step_name: String,
        /// Target of the output
        target_step_name: String,
        /// Transport of the output
        transport_type: TransportType,
    },

    /// An output attempt failed
    Failed {
        /// Stream being routed
        stream_id: String,
        /// Step whose output was routed
        step_name: String,
        /// Target of the output
        target_step_name: String,
        /// Transport of the output
        transport_type: TransportType,
        /// Failure message
        message: String,
    },
}

impl RoutingEvent {
    /// Target step the event refers to
    pub fn target_step_name(&self) -> &str {
        match self {
            Self::Started {
                target_step_name, ..
            }
            | Self::Completed {
                target_step_name, ..
            }
            | Self::Failed {
                target_step_name, ..
            } => target_step_name,
        }
    }
}

/// Receiver of routing events
pub trait RoutingEventSink: Send + Sync {
    /// Observe one event; must be cheap and must not block
    fn on_event(&self, event: &RoutingEvent);
}

/// Event sink that forwards to structured logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl RoutingEventSink for LogEventSink {
    fn on_event(&self, event: &RoutingEvent) {
        match event {
            RoutingEvent::Started {
                stream_id,
                step_name,
                target_step_name,
                transport_type,
            } => tracing::debug!(
                stream = %stream_id,
                step = %step_name,
                target = %target_step_name,
                transport = %transport_type,
                "routing output started"
            ),
            RoutingEvent::Completed {
                stream_id,
                step_name,
                target_step_name,
                transport_type,
            } => tracing::debug!(
                stream = %stream_id,
                step = %step_name,
                target = %target_step_name,
                transport = %transport_type,
                "routing output completed"
            ),
            RoutingEvent::Failed {
                stream_id,
                step_name,
                target_step_name,
                transport_type,
                message,
            } => tracing::warn!(
                stream = %stream_id,
                step = %step_name,
                target = %target_step_name,
                transport = %transport_type,
                error = %message,
                "routing output failed"
            ),
        }
    }
}
