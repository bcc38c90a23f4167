// src/transport/framer.rs

//! Reassembles request frames from partial non-blocking reads.

use super::socket::{ReadStatus, Socket};
use crate::core::ProfCtlError;
use crate::core::protocol::FrameCodec;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

#[derive(Debug, Default)]
pub struct Framer {
    buffer: BytesMut,
    codec: FrameCodec,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls available bytes from the socket into the reassembly buffer.
    pub fn read_from(&mut self, socket: &mut Socket) -> io::Result<ReadStatus> {
        socket.read_into(&mut self.buffer)
    }

    /// Appends raw bytes, e.g. data received through another channel.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete frame payload, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, ProfCtlError> {
        self.codec.decode(&mut self.buffer)
    }

    /// Discards any partially received frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
