// Gateway module for the telematics API - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod envelope;
mod error;
mod http;
mod traits;

// Public re-exports - the ONLY way to access gateway functionality
pub use client::Gateway;
pub use envelope::{EntityQuery, RpcErrorBody, RpcErrorDetail, RpcRequest, RpcResponse};
pub use error::GatewayError;
pub use http::HttpTransport;
pub use traits::RpcTransport;
