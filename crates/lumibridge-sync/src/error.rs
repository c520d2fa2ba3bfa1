//! Error types for the sync engine.

use lumibridge_devices::AdapterError;
use thiserror::Error;

/// Errors raised while bridging a device.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Publishing or subscribing on the broker failed
    #[error("Broker error: {0}")]
    Broker(String),

    /// Remote API call failed
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Malformed storage document or command payload
    #[error("Invalid payload: {0}")]
    Payload(String),

    /// Topic slug does not belong to a bridged device
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Startup found nothing to bridge
    #[error("No cameras found: {0}")]
    NoDevices(String),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
