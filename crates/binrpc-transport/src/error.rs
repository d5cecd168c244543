/// Errors that can occur while dialing or using a control socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The control socket address could not be parsed.
    #[error("invalid control socket address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: &'static str },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
