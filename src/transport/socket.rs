// src/transport/socket.rs

//! A non-blocking client connection with a buffered outbound side.

use bytes::{Buf, BytesMut};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};

const READ_CHUNK: usize = 4096;

/// Once this many response bytes wait for the peer, no further requests are read.
pub const MAX_PENDING_OUTPUT: usize = 1024 * 1024;

/// The result of a single non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Data(usize),
    WouldBlock,
    Closed,
}

#[derive(Debug)]
pub struct Socket {
    stream: TcpStream,
    peer: SocketAddr,
    outbound: BytesMut,
}

impl Socket {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer,
            outbound: BytesMut::new(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Reads whatever is available into `buf` without blocking.
    pub fn read_into(&mut self, buf: &mut BytesMut) -> io::Result<ReadStatus> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(ReadStatus::Closed),
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    return Ok(ReadStatus::Data(n));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadStatus::WouldBlock);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Appends bytes to the outbound buffer; `flush` sends them.
    pub fn queue(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }

    /// Writes as much of the outbound buffer as the socket accepts right now.
    pub fn flush(&mut self) -> io::Result<()> {
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => self.outbound.advance(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// True when the peer has stopped reading and the outbound buffer reached its limit.
    pub fn is_backlogged(&self) -> bool {
        self.outbound.len() >= MAX_PENDING_OUTPUT
    }
}
