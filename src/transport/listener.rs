// src/transport/listener.rs

//! A named TCP listener that can be polled for connections without blocking.

use super::socket::Socket;
use std::fmt;
use std::io;
use std::net::TcpListener;
use tracing::info;

#[derive(Debug)]
pub struct Listener {
    name: String,
    blocking: bool,
    host: String,
    port: u16,
    inner: Option<TcpListener>,
}

impl Listener {
    pub fn new(name: impl Into<String>, blocking: bool, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            blocking,
            host: host.into(),
            port,
            inner: None,
        }
    }

    /// Binds the listener. Calling `start` on a started listener is a no-op.
    pub fn start(&mut self) -> io::Result<()> {
        if self.inner.is_some() {
            return Ok(());
        }
        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        listener.set_nonblocking(!self.blocking)?;
        self.inner = Some(listener);
        info!("{} listening for connections", self);
        Ok(())
    }

    /// The bound port once started (resolving port 0), the configured port before.
    pub fn port(&self) -> u16 {
        self.inner
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map_or(self.port, |addr| addr.port())
    }

    /// Accepts one pending connection, or returns `Ok(None)` if none is waiting.
    pub fn accept(&self) -> io::Result<Option<Socket>> {
        let Some(listener) = self.inner.as_ref() else {
            return Ok(None);
        };
        match listener.accept() {
            Ok((stream, peer)) => Socket::new(stream, peer).map(Some),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Closes the listening socket. Pending connections are refused by the OS afterwards.
    pub fn stop(&mut self) {
        if self.inner.take().is_some() {
            info!("{} stopped", self);
        }
    }
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.host, self.port())
    }
}
