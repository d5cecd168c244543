use binrpc_transport::DEFAULT_CTL_ADDRESS;
use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invoke an RPC method and print the reply.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Control socket address (unix:PATH, tcp:HOST:PORT or a bare path).
    #[arg(
        long,
        short = 's',
        value_name = "ADDR",
        env = "BINRPC_SOCKET",
        default_value = DEFAULT_CTL_ADDRESS
    )]
    pub socket: String,
    /// Connect and reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// RPC method name, e.g. core.uptime.
    pub method: String,
    /// Method arguments. Prefix with s:, i: or d: to force string, int or double.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
