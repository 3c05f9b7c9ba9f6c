use thiserror::Error;

/// Why the orientation stream is unavailable or permission was refused.
///
/// The manager holds at most one of these at a time and never returns it as
/// an `Err`; consumers observe it through the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorFailure {
    /// The platform has no orientation event capability.
    #[error("Device Orientation Sensor Not Available.")]
    Unavailable,
    /// The user refused the permission prompt.
    #[error("Device orientation access denied by user.")]
    Denied,
    /// The permission prompt itself threw or rejected.
    #[error("Permission request failed.")]
    RequestFailed,
}

/// The platform permission call failed before producing an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("permission prompt failed: {0}")]
pub struct PromptError(pub String);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("HTTP bind failed: {0}")]
    Bind(String),
    #[error("failed to resolve server port")]
    NoPort,
    #[error("failed to build runtime: {0}")]
    Runtime(std::io::Error),
    #[error("QR encode failed: {0}")]
    Qr(#[from] qrcode::types::QrError),
}
