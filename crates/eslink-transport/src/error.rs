/// Errors that can occur in the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No open session exists for the handle.
    #[error("no open session for {0}")]
    NotConnected(crate::SessionHandle),

    /// The label is not reachable or not known to the stack.
    #[error("device {0} unreachable")]
    Unreachable(crate::DeviceAddress),

    /// The label does not expose the label GATT service.
    #[error("service not found on {0}")]
    ServiceNotFound(crate::DeviceAddress),

    /// A required characteristic is missing from the service.
    #[error("characteristic for {0} channel not found")]
    CharacteristicNotFound(crate::Channel),

    /// Nothing arrived before the read deadline.
    #[error("read timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Writing to a characteristic failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Reading from a characteristic failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Pairing was refused or could not complete.
    #[error("pairing failed: {0}")]
    PairingFailed(String),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

/// A string that is not a `aa:bb:cc:dd:ee:ff` address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device address: {0:?}")]
pub struct AddressParseError(pub String);
