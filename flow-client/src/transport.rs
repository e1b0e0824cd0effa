//! Seams between the client and its backend.
//!
//! [`HttpTransport`](crate::HttpTransport) implements both traits; tests and
//! hosts with their own networking can substitute anything else.

use async_trait::async_trait;
use flow_core::FlowConfig;

use crate::batcher::EventEnvelope;
use crate::identity::IdentifyRequest;
use crate::ClientResult;

/// Source of the remote flow configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the current flow configuration. A single attempt.
    async fn fetch_config(&self) -> ClientResult<FlowConfig>;
}

/// Upstream receiver of telemetry and identity.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Upload one batch of events. A single attempt.
    async fn send_events(&self, events: &[EventEnvelope]) -> ClientResult<()>;

    /// Attach a user to the device upstream. A single attempt.
    async fn identify(&self, request: &IdentifyRequest) -> ClientResult<()>;
}
