use crate::dispatch::RequestDescriptor;
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;

/// Executes request descriptors against the backend and hands back the
/// response payload. Every failure mode is reported as a `TransportError`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value, TransportError>;
}
