// src/core/protocol/frame.rs

//! Implements the frame layout used on the control connection and the corresponding
//! `Encoder` and `Decoder` for network communication.
//!
//! Every frame starts with an 8 character, zero padded, decimal length field followed by
//! exactly that many payload bytes. Requests carry a command line as payload; responses
//! carry `rc=<code>|<payload>`.

use super::response::Response;
use crate::core::ProfCtlError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Width of the decimal length field at the start of every frame.
pub const HEADER_LEN: usize = 8;

/// The largest length representable in the header.
pub const MAX_FRAME_LEN: usize = 99_999_999;

/// Requests are short command lines; anything larger is treated as a corrupt stream.
pub const MAX_REQUEST_LEN: usize = 1024 * 1024;

/// Length of the `rc=N|` prefix that precedes every response payload.
const RC_PREFIX_LEN: usize = 5;

/// A `tokio_util::codec` implementation for decoding request frames and encoding
/// `Response` frames. Request frames above `MAX_REQUEST_LEN` are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProfCtlError;

    /// Decodes one frame payload from `src`, leaving any trailing bytes in place.
    /// Returns `Ok(None)` until a complete frame has been buffered.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let len = parse_length(&src[..HEADER_LEN])?;
        if len > MAX_REQUEST_LEN {
            return Err(ProfCtlError::FrameTooLarge(len));
        }

        let total = HEADER_LEN + len;
        if src.len() < total {
            // Reserve the remainder up front so the next reads land in one allocation.
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Response> for FrameCodec {
    type Error = ProfCtlError;

    /// Encodes a `Response` as `%08u(len(payload) + 5) rc=<code>|<payload>`.
    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = item.payload.len() + RC_PREFIX_LEN;
        if len > MAX_FRAME_LEN {
            return Err(ProfCtlError::FrameTooLarge(len));
        }
        dst.reserve(HEADER_LEN + len);
        dst.extend_from_slice(format!("{len:08}").as_bytes());
        dst.extend_from_slice(b"rc=");
        dst.extend_from_slice(item.code.as_digit().as_bytes());
        dst.extend_from_slice(b"|");
        dst.extend_from_slice(item.payload.as_bytes());
        Ok(())
    }
}

/// Frames a request payload the way a controller sends it.
pub fn encode_request_frame(payload: &[u8]) -> Result<BytesMut, ProfCtlError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProfCtlError::FrameTooLarge(payload.len()));
    }
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(format!("{:08}", payload.len()).as_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Parses the fixed-width decimal length field.
fn parse_length(header: &[u8]) -> Result<usize, ProfCtlError> {
    if !header.iter().all(u8::is_ascii_digit) {
        return Err(ProfCtlError::InvalidFrame(format!(
            "malformed length header '{}'",
            String::from_utf8_lossy(header)
        )));
    }
    let digits = std::str::from_utf8(header)?;
    Ok(digits.parse::<usize>()?)
}
