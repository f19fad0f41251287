use thiserror::Error;

use crate::documents::DocumentError;
use crate::fleet::{AccountError, ServiceRequestError};
use crate::gateway::GatewayError;

/// Main error type for Fleetlink
#[derive(Error, Debug)]
pub enum FleetlinkError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Document store error: {0}")]
    Documents(#[from] DocumentError),

    #[error("{0}")]
    ServiceRequest(#[from] ServiceRequestError),

    #[error("{0}")]
    Account(#[from] AccountError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in: {0}")]
    NotSignedIn(String),
}
