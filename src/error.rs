use thiserror::Error as ThisError;

/// Failures reported by the sensor collaborator.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The driver returned no data or a fetch/channel error.
    #[error("sensor data unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by the wireless transport collaborator.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport initialization failed: {0}")]
    InitFailed(String),

    #[error("service registration failed: {0}")]
    RegisterFailed(String),

    #[error("advertising failed to start: {0}")]
    AdvertiseFailed(String),

    /// The controller is already advertising. Never fatal.
    #[error("advertising already started")]
    AlreadyAdvertising,

    #[error("notification to connection {handle} failed: {reason}")]
    NotifyFailed { handle: u16, reason: String },
}

/// ATT protocol errors returned to a peer from the read handler.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttError {
    #[error("invalid attribute handle 0x{0:04X}")]
    InvalidHandle(u16),

    #[error("read offset {offset} beyond value length {len}")]
    InvalidOffset { offset: usize, len: usize },
}

impl AttError {
    /// ATT error code as sent on the wire.
    pub fn code(&self) -> u8 {
        match self {
            AttError::InvalidHandle(_) => 0x01,
            AttError::InvalidOffset { .. } => 0x07,
        }
    }
}

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("no sensor device bound to '{0}'")]
    SensorNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_att_error_codes() {
        assert_eq!(AttError::InvalidHandle(0x0010).code(), 0x01);
        assert_eq!(AttError::InvalidOffset { offset: 9, len: 8 }.code(), 0x07);
    }

    #[test]
    fn test_transport_error_converts_to_bridge_error() {
        let err: BridgeError = TransportError::InitFailed("hci reset timeout".into()).into();
        assert_eq!(
            err.to_string(),
            "transport initialization failed: hci reset timeout"
        );
    }
}
