//! Query transaction statistics from a running Kamailio.
//!
//! Run with:
//!   cargo run --example tm-stats -- unix:/run/kamailio/kamailio_ctl

use std::time::Duration;

use binrpc::codec::{CodecConfig, PacketReader, PacketWriter, Value};
use binrpc::transport::{CtlAddress, DEFAULT_CTL_ADDRESS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address: CtlAddress = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CTL_ADDRESS.to_string())
        .parse()?;

    let config = CodecConfig {
        read_timeout: Some(Duration::from_secs(3)),
        ..CodecConfig::default()
    };
    let stream = address.connect(Some(Duration::from_secs(3)))?;
    let mut writer = PacketWriter::new(stream.try_clone()?);
    let mut reader = PacketReader::with_config_ctl(stream, config)?;

    let cookie = writer.write_packet(&[Value::from("tm.stats")])?;
    let records = reader.read_response(Some(cookie))?;
    let Some(stats) = records.first() else {
        eprintln!("empty reply from {address}");
        return Ok(());
    };

    for key in ["current", "waiting", "total", "total_local", "replied_locally"] {
        match stats.field(key) {
            Some(record) => println!("{key:>16}: {}", record.to_text()?),
            None => println!("{key:>16}: -"),
        }
    }
    Ok(())
}
