use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session spawn failed: {0}")]
    SpawnFailed(String),
    #[error("session call failed: {0}")]
    CallFailed(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("recipient unreachable: {0}")]
    Unreachable(String),
}
