//! Pipework - Routing
//!
//! The fan-out router at the center of the engine: given a step's
//! declarative configuration, pick the transport handler for each
//! declared output, deliver the stream through it, and report one tagged
//! result per output.
//!
//! # Architecture
//!
//! ```text
//! [Caller]                   [Router]                       [Handlers]
//!   route_request ──────→ gRPC-only dispatch ──────────→ GrpcTransportHandler
//!   route_stream ───────→ per-output concurrent fan-out ┬→ GrpcTransportHandler
//!                            one RoutingResult each     ├→ KafkaTransportHandler
//!                            (failures isolated)        └→ InternalTransportHandler
//! ```
//!
//! # Key Design
//!
//! - **Write-once handler registry**: handlers are registered at
//!   composition time; the router is then shared behind `Arc` and only
//!   read.
//! - **Independent fan-out**: outputs are routed concurrently; a failing
//!   output is captured in its own result and never aborts siblings.
//! - **Single attempt per call**: the retry layer ([`retry`]) sits above
//!   the router and applies the step's retry policy to surfaced failures.
//! - **Observability events**: published around each per-output attempt,
//!   monitoring-only, never control flow.

mod error;
mod events;
mod metrics;
mod result;
pub mod retry;
mod router;

pub use error::{Result, RoutingError};
pub use events::{LogEventSink, RoutingEvent, RoutingEventSink};
pub use metrics::{MetricsSnapshot, RouterMetrics};
pub use result::{RouteStatus, RoutingResult};
pub use router::Router;
