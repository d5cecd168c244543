use binrpc_codec::header::VERSION;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("binrpc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: binrpc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol_version: {VERSION}");
    println!(
        "target: {}",
        option_env!("BINRPC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "unix_sockets: {}",
        if cfg!(unix) { "supported" } else { "unsupported" }
    );

    Ok(SUCCESS)
}
