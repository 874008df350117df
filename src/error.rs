//! Error types for capture operations

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, compositing or saving
///
/// Every variant renders a non-empty message naming the stage that failed so
/// callers can surface it directly.
#[derive(Error, Debug)]
pub enum Error {
    /// Capture was attempted on a privileged browser page
    #[error("Cannot capture this page: {0}")]
    RestrictedPage(String),

    /// Page dimensions could not be obtained
    #[error("Failed to probe page dimensions: {0}")]
    ProbeFailure(String),

    /// A scroll/settle round-trip did not complete
    #[error("Scroll to offset {offset}px failed: {reason}")]
    ScrollFailure { offset: u32, reason: String },

    /// Frame grab failed, or a captured frame could not be decoded
    #[error("Capture failed: {0}")]
    CaptureFailure(String),

    /// The composite could not be serialized
    #[error("Encoding failed: {0}")]
    EncodeFailure(String),

    /// The output sink rejected the payload
    #[error("Failed to save {filename}: {reason}")]
    SaveFailure { filename: String, reason: String },

    /// A full-page session is already running
    #[error("A full-page capture is already in progress")]
    CaptureInProgress,

    /// The session was stopped through its cancel token
    #[error("Capture cancelled")]
    Cancelled,

    /// A selection rectangle is empty or outside the captured frame
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Window bookkeeping failed
    #[error("Window error: {0}")]
    WindowError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short, stable name of the failure kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::RestrictedPage(_) => "restricted_page",
            Error::ProbeFailure(_) => "probe_failure",
            Error::ScrollFailure { .. } => "scroll_failure",
            Error::CaptureFailure(_) => "capture_failure",
            Error::EncodeFailure(_) => "encode_failure",
            Error::SaveFailure { .. } => "save_failure",
            Error::CaptureInProgress => "capture_in_progress",
            Error::Cancelled => "cancelled",
            Error::InvalidSelection(_) => "invalid_selection",
            Error::WindowError(_) => "window_error",
            Error::ConfigError(_) => "config_error",
            #[cfg(feature = "cdp")]
            Error::CdpError(_) => "cdp_error",
            Error::Other(_) => "other",
        }
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

impl From<crate::host::GrabError> for Error {
    fn from(err: crate::host::GrabError) -> Self {
        Error::CaptureFailure(err.to_string())
    }
}
