//! Conexiones TCP a un backend como recurso del pool
//!
//! El chequeo de vida es un `peek` no bloqueante: `WouldBlock` significa que
//! el socket sigue abierto y sin datos pendientes, `Ok(0)` que el otro
//! extremo cerró.

use super::ResourceManager;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Conexión prestada por el pool
#[derive(Debug)]
pub struct BackendConnection {
    stream: TcpStream,
    closed: bool,
}

impl BackendConnection {
    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Cierra el socket; al liberarla, el pool la descarta
    pub fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Read for BackendConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for BackendConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Abre y sondea conexiones TCP hacia una dirección fija
#[derive(Debug, Clone)]
pub struct TcpManager {
    addr: SocketAddr,
    connect_timeout: Duration,
}

impl TcpManager {
    /// Resuelve la dirección una sola vez
    pub fn new(addr: impl ToSocketAddrs, connect_timeout: Duration) -> io::Result<Self> {
        let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "backend address did not resolve")
        })?;
        Ok(Self {
            addr,
            connect_timeout,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl ResourceManager for TcpManager {
    type Resource = BackendConnection;
    type Error = io::Error;

    fn connect(&self) -> io::Result<BackendConnection> {
        let stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout)?;
        stream.set_nodelay(true)?;
        tracing::debug!(addr = %self.addr, "backend connection opened");
        Ok(BackendConnection {
            stream,
            closed: false,
        })
    }

    // El peek es no bloqueante: responde de inmediato, antes de cualquier plazo
    fn is_valid(&self, conn: &mut BackendConnection, _deadline: Duration) -> bool {
        if conn.closed {
            return false;
        }
        if conn.stream.set_nonblocking(true).is_err() {
            return false;
        }

        let mut byte = [0u8; 1];
        let alive = match conn.stream.peek(&mut byte) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(_) => false,
        };

        alive && conn.stream.set_nonblocking(false).is_ok()
    }

    fn is_closed(&self, conn: &BackendConnection) -> bool {
        conn.closed
    }
}
