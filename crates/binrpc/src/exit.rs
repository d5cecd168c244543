use std::fmt;
use std::io;

use binrpc_codec::BinRpcError;
use binrpc_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidAddress { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Connect { source, addr } => {
            io_error(&format!("{context} ({addr})"), source)
        }
        TransportError::Io(source) => io_error(context, source),
    }
}

pub fn codec_error(context: &str, err: BinRpcError) -> CliError {
    match err {
        BinRpcError::Io(source) => io_error(context, source),
        BinRpcError::ConnectionClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        BinRpcError::Fault { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        BinRpcError::Protocol(_)
        | BinRpcError::LengthTooBig { .. }
        | BinRpcError::PayloadTooLarge { .. }
        | BinRpcError::CookieMismatch { .. }
        | BinRpcError::TypeNotImplemented(_)
        | BinRpcError::DepthExceeded { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        BinRpcError::Encoding(_) => CliError::new(USAGE, format!("{context}: {err}")),
        BinRpcError::TypeMismatch { .. } | BinRpcError::NotANumber(_) => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}
