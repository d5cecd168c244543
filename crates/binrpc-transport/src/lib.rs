//! Stream transport for BINRPC control sockets.
//!
//! The proxy's control module listens on either a Unix domain socket or a
//! TCP port. This crate dials one of them and hands back a [`CtlStream`]
//! that implements `Read + Write`; the codec layer never opens a connection
//! itself and works against any byte stream.

pub mod address;
pub mod error;
pub mod stream;

pub use address::{CtlAddress, DEFAULT_CTL_ADDRESS};
pub use error::{Result, TransportError};
pub use stream::CtlStream;
