use std::time::Duration;

use binrpc_codec::{CodecConfig, PacketReader, PacketWriter, Value};
use binrpc_transport::CtlAddress;
use tracing::debug;

use crate::cmd::CallArgs;
use crate::exit::{codec_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let address: CtlAddress = args
        .socket
        .parse()
        .map_err(|err| transport_error("invalid --socket", err))?;

    let mut values = Vec::with_capacity(args.args.len() + 1);
    values.push(Value::from(args.method.as_str()));
    for arg in &args.args {
        values.push(parse_arg(arg)?);
    }

    let stream = address
        .connect(Some(timeout))
        .map_err(|err| transport_error("connect failed", err))?;
    debug!(%address, transport = stream.transport_name(), "control socket connected");

    let config = CodecConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..CodecConfig::default()
    };
    let write_half = stream
        .try_clone()
        .map_err(|err| transport_error("connect failed", err))?;
    let mut writer = PacketWriter::with_config_ctl(write_half, config.clone())
        .map_err(|err| codec_error("connect failed", err))?;
    let mut reader = PacketReader::with_config_ctl(stream, config)
        .map_err(|err| codec_error("connect failed", err))?;

    let cookie = writer
        .write_packet(&values)
        .map_err(|err| codec_error("send failed", err))?;
    let records = reader
        .read_response(Some(cookie))
        .map_err(|err| codec_error(&format!("{} failed", args.method), err))?;

    print_reply(&args.method, cookie, &records, format);
    Ok(SUCCESS)
}

/// Parse one command-line argument into a value.
///
/// `s:`, `i:` and `d:` force the kind; otherwise base-10 integers become
/// ints and everything else is sent as a string.
fn parse_arg(arg: &str) -> CliResult<Value> {
    if let Some(text) = arg.strip_prefix("s:") {
        return Ok(Value::from(text));
    }
    if let Some(number) = arg.strip_prefix("i:") {
        return number
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| CliError::new(USAGE, format!("invalid int argument: {arg}")));
    }
    if let Some(number) = arg.strip_prefix("d:") {
        return number
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| CliError::new(USAGE, format!("invalid double argument: {arg}")));
    }
    Ok(arg
        .parse::<i32>()
        .map(Value::Int)
        .unwrap_or_else(|_| Value::from(arg)))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
