use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::CtlStream;

/// Default control socket of a stock installation.
pub const DEFAULT_CTL_ADDRESS: &str = "unix:/run/kamailio/kamailio_ctl";

/// Where a control socket listens.
///
/// Parsed from `unix:/path/to/socket`, `tcp:host:port`, or a bare
/// filesystem path (taken as a Unix socket).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtlAddress {
    /// Filesystem path of a Unix domain socket.
    Unix(PathBuf),
    /// Host and port of a TCP listener.
    Tcp { host: String, port: u16 },
}

impl CtlAddress {
    /// Connect to the control socket (blocking).
    ///
    /// With a timeout, TCP connects use it per resolved address; Unix
    /// sockets connect immediately or fail.
    pub fn connect(&self, timeout: Option<Duration>) -> Result<CtlStream> {
        match self {
            #[cfg(unix)]
            CtlAddress::Unix(path) => connect_unix(path),
            #[cfg(not(unix))]
            CtlAddress::Unix(path) => Err(TransportError::Connect {
                addr: self.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("unix sockets unavailable on this platform: {}", path.display()),
                ),
            }),
            CtlAddress::Tcp { host, port } => connect_tcp(self, host, *port, timeout),
        }
    }
}

#[cfg(unix)]
fn connect_unix(path: &Path) -> Result<CtlStream> {
    let stream =
        std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
            addr: format!("unix:{}", path.display()),
            source: e,
        })?;
    debug!(?path, "connected to unix domain socket");
    Ok(CtlStream::from_unix(stream))
}

fn connect_tcp(
    addr: &CtlAddress,
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<CtlStream> {
    let connect_err = |source| TransportError::Connect {
        addr: addr.to_string(),
        source,
    };

    let stream = match timeout {
        None => TcpStream::connect((host, port)).map_err(connect_err)?,
        Some(timeout) => {
            let mut last_err = None;
            let mut connected = None;
            for sock_addr in (host, port).to_socket_addrs().map_err(connect_err)? {
                match TcpStream::connect_timeout(&sock_addr, timeout) {
                    Ok(stream) => {
                        connected = Some(stream);
                        break;
                    }
                    Err(err) => last_err = Some(err),
                }
            }
            match connected {
                Some(stream) => stream,
                None => {
                    return Err(connect_err(last_err.unwrap_or_else(|| {
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "host resolved to no addresses",
                        )
                    })))
                }
            }
        }
    };

    // Requests are small and latency-bound.
    stream.set_nodelay(true)?;
    debug!(host, port, "connected to tcp control socket");
    Ok(CtlStream::from_tcp(stream))
}

impl FromStr for CtlAddress {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason| TransportError::InvalidAddress {
            input: input.to_string(),
            reason,
        };

        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("address must not be empty"));
        }

        if let Some(path) = input.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(CtlAddress::Unix(PathBuf::from(path)));
        }

        if let Some(rest) = input.strip_prefix("tcp:") {
            let (host, port) = rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            return Ok(CtlAddress::Tcp {
                host: host.to_string(),
                port,
            });
        }

        if input.contains(':') && !input.starts_with('/') && !input.starts_with('.') {
            return Err(invalid("unknown scheme (expected unix: or tcp:)"));
        }

        Ok(CtlAddress::Unix(PathBuf::from(input)))
    }
}

impl fmt::Display for CtlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtlAddress::Unix(path) => write!(f, "unix:{}", path.display()),
            CtlAddress::Tcp { host, port } if host.contains(':') => {
                write!(f, "tcp:[{host}]:{port}")
            }
            CtlAddress::Tcp { host, port } => write!(f, "tcp:{host}:{port}"),
        }
    }
}
