//! Connection handling abstractions for the listener.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use rustls::{ServerConnection, StreamOwned};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types handed to a [`ConnectionHandler`].
pub enum ConnectionStream {
    /// Plain TCP.
    Tcp(TcpStream),
    /// Unix-domain socket.
    #[cfg(unix)]
    Unix(UnixStream),
    /// TCP after a completed TLS handshake.
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl ConnectionStream {
    /// Printable description of the remote end.
    #[must_use]
    pub fn peer(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| "tcp".to_owned(), |addr| format!("tcp://{addr}")),
            #[cfg(unix)]
            Self::Unix(_) => "unix".to_owned(),
            Self::Tls(stream) => stream
                .sock
                .peer_addr()
                .map_or_else(|_| "tls".to_owned(), |addr| format!("tls://{addr}")),
        }
    }

    /// Applies the same deadline to reads and writes; `None` blocks forever.
    ///
    /// # Errors
    ///
    /// Returns the socket error when the deadline cannot be set.
    pub fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
            #[cfg(unix)]
            Self::Unix(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
            Self::Tls(stream) => {
                stream.sock.set_read_timeout(timeout)?;
                stream.sock.set_write_timeout(timeout)
            }
        }
    }

    /// Flushes and closes the write half. TLS streams send `close_notify`
    /// first.
    ///
    /// # Errors
    ///
    /// Returns the socket error when flushing or shutting down fails.
    pub fn finish(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => {
                stream.flush()?;
                stream.shutdown(Shutdown::Write)
            }
            #[cfg(unix)]
            Self::Unix(stream) => {
                stream.flush()?;
                stream.shutdown(Shutdown::Write)
            }
            Self::Tls(stream) => {
                stream.conn.send_close_notify();
                stream.flush()?;
                while stream.conn.wants_write() {
                    stream.conn.write_tls(&mut stream.sock)?;
                }
                stream.sock.shutdown(Shutdown::Write)
            }
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}
