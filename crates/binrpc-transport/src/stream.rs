use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;

/// A connected control socket stream implementing `Read + Write`.
///
/// On Unix this wraps either a Unix domain socket or a TCP stream; elsewhere
/// only TCP is available.
pub struct CtlStream {
    inner: CtlStreamInner,
}

enum CtlStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for CtlStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(stream) => stream.read(buf),
            CtlStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for CtlStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(stream) => stream.write(buf),
            CtlStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(stream) => stream.flush(),
            CtlStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl CtlStream {
    /// Wrap an already connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: CtlStreamInner::Unix(stream),
        }
    }

    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: CtlStreamInner::Tcp(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            CtlStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            CtlStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            CtlStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            CtlStreamInner::Unix(_) => "unix-domain-socket",
            CtlStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for CtlStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtlStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn unix_pair_reads_and_writes() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut client = CtlStream::from_unix(left);
        let mut server = CtlStream::from_unix(right);

        client.write_all(b"ping").unwrap();
        client.flush().unwrap();

        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        assert_eq!(client.transport_name(), "unix-domain-socket");
    }

    #[test]
    fn tcp_loopback_reads_and_writes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 3];
            peer.read_exact(&mut buf).unwrap();
            peer.write_all(&buf).unwrap();
        });

        let mut stream = CtlStream::from_tcp(TcpStream::connect(addr).unwrap());
        stream.write_all(b"abc").unwrap();
        let mut echoed = [0u8; 3];
        stream.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"abc");
        assert_eq!(stream.transport_name(), "tcp");

        handle.join().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn timeouts_and_clone_apply() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let stream = CtlStream::from_unix(left);

        stream
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        stream
            .set_write_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        let cloned = stream.try_clone().unwrap();
        assert_eq!(format!("{cloned:?}"), "CtlStream { type: \"unix-domain-socket\" }");
    }
}
