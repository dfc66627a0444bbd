use std::time::Duration;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VncError {
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Unsupported rectangle encoding {0}")]
    UnsupportedEncoding(u32),
    #[error("Unsupported server message {0}")]
    UnsupportedMessage(u8),
    #[error("Unknown pixel format with {0} bits per pixel")]
    WrongPixelFormat(u8),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("I/O timed out after {0:?}")]
    Timeout(Duration),
    #[error("Client is not connected")]
    NotConnected,
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl VncError {
    /// Whether the server sent data this client can not make sense of
    ///
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            VncError::Protocol(_)
                | VncError::UnsupportedEncoding(_)
                | VncError::UnsupportedMessage(_)
                | VncError::WrongPixelFormat(_)
        )
    }
}
