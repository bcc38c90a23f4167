// src/core/protocol/response.rs

//! The response half of the control protocol.

use super::frame::FrameCodec;
use crate::core::ProfCtlError;
use crate::core::request::{Outcome, Request};
use bytes::BytesMut;
use tokio_util::codec::Encoder;

/// The single digit return code carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success,
    Failure,
}

impl ReturnCode {
    pub fn as_digit(self) -> &'static str {
        match self {
            ReturnCode::Success => "0",
            ReturnCode::Failure => "1",
        }
    }

    fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(ReturnCode::Success),
            b'1' => Some(ReturnCode::Failure),
            _ => None,
        }
    }
}

/// A response to one request: a return code and an unpadded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: ReturnCode,
    pub payload: String,
}

impl Response {
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            code: ReturnCode::Success,
            payload: payload.into(),
        }
    }

    pub fn failure(payload: impl Into<String>) -> Self {
        Self {
            code: ReturnCode::Failure,
            payload: payload.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ReturnCode::Success
    }

    /// Parses the body of a response frame (`rc=<code>|<payload>`), i.e. the bytes that
    /// follow the length header.
    pub fn parse(body: &[u8]) -> Result<Self, ProfCtlError> {
        let malformed = || {
            ProfCtlError::InvalidFrame(format!(
                "malformed response body '{}'",
                String::from_utf8_lossy(body)
            ))
        };
        let rest = body.strip_prefix(b"rc=").ok_or_else(malformed)?;
        let (&digit, rest) = rest.split_first().ok_or_else(malformed)?;
        let code = ReturnCode::from_digit(digit).ok_or_else(malformed)?;
        let payload = rest.strip_prefix(b"|").ok_or_else(malformed)?;
        Ok(Self {
            code,
            payload: std::str::from_utf8(payload)?.to_string(),
        })
    }

    /// Encodes the response into its complete wire form, length header included.
    pub fn encode_to_string(&self) -> Result<String, ProfCtlError> {
        let mut buf = BytesMut::new();
        FrameCodec::new().encode(self.clone(), &mut buf)?;
        // The header and prefix are ASCII and the payload came from a `String`.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl From<&Request> for Response {
    /// Success iff the request carries a response; otherwise its errors are sent as a failure.
    fn from(request: &Request) -> Self {
        match request.outcome() {
            Some(Outcome::Response(payload)) => Response::success(payload.clone()),
            Some(Outcome::Errors(errors)) => Response::failure(errors.clone()),
            None => Response::failure("request was not executed"),
        }
    }
}

/// Encodes a payload and return code into a complete response frame.
pub fn encode_response(code: ReturnCode, payload: &str) -> Result<String, ProfCtlError> {
    Response {
        code,
        payload: payload.to_string(),
    }
    .encode_to_string()
}
