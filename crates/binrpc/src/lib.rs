//! BINRPC client and codec for the Kamailio control socket.
//!
//! # Crate Structure
//!
//! - [`transport`]: control socket addresses and the connected stream
//! - [`codec`]: packet headers, records, cookies and blocking reader/writer
//!
//! ```no_run
//! use binrpc::codec::{PacketReader, PacketWriter, Value};
//! use binrpc::transport::CtlAddress;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = "unix:/run/kamailio/kamailio_ctl".parse::<CtlAddress>()?.connect(None)?;
//! let mut writer = PacketWriter::new(stream.try_clone()?);
//! let mut reader = PacketReader::new(stream);
//!
//! let cookie = writer.write_packet(&[Value::from("core.uptime")])?;
//! for record in reader.read_response(Some(cookie))? {
//!     println!("{:?}", record.value);
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use binrpc_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use binrpc_codec::*;
}
