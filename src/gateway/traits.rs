use async_trait::async_trait;

use super::envelope::{RpcRequest, RpcResponse};
use super::error::GatewayError;

/// Carries one RPC envelope to the telematics endpoint and back
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// POST the request and decode the reply envelope. Errors here are
    /// transport-level only; application errors come back inside the
    /// envelope.
    async fn post(&self, request: &RpcRequest) -> Result<RpcResponse, GatewayError>;
}
