// src/core/request/parser.rs

//! Turns the payload of a request frame into a `Request`.

use super::{Arguments, Request};
use crate::core::ProfCtlError;
use tracing::debug;

/// Maximum number of `--key value` options accepted in a single request.
const MAX_OPTIONS: usize = 64;

/// Parses `<command> [--key value]...` command lines.
///
/// Parsing never fails outright: a malformed payload produces a `Request` that already
/// carries its error, so the caller can answer it like any other failed request.
#[derive(Debug, Default)]
pub struct RequestParser;

impl RequestParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, data: &[u8]) -> Request {
        match Self::parse_command_line(data) {
            Ok(request) => request,
            Err(e) => {
                debug!("Rejecting request: {}", e);
                Request::rejected(e.to_string())
            }
        }
    }

    fn parse_command_line(data: &[u8]) -> Result<Request, ProfCtlError> {
        let text = std::str::from_utf8(data)?;
        let mut tokens = text.split_whitespace();

        let command = tokens
            .next()
            .ok_or_else(|| ProfCtlError::InvalidRequest("empty request".to_string()))?;
        if command.starts_with("--") {
            return Err(ProfCtlError::InvalidRequest(format!(
                "expected a command name, found option '{command}'"
            )));
        }

        let mut args = Arguments::new();
        while let Some(token) = tokens.next() {
            let key = token.strip_prefix("--").ok_or_else(|| {
                ProfCtlError::InvalidRequest(format!("unexpected token '{token}'"))
            })?;
            if key.is_empty() {
                return Err(ProfCtlError::InvalidRequest(
                    "option name cannot be empty".to_string(),
                ));
            }
            let value = tokens.next().ok_or_else(|| {
                ProfCtlError::InvalidRequest(format!("missing value for option '--{key}'"))
            })?;
            if args.len() == MAX_OPTIONS {
                return Err(ProfCtlError::InvalidRequest(format!(
                    "too many options (max {MAX_OPTIONS})"
                )));
            }
            args.push(key, value);
        }

        Ok(Request::from_parts(command.to_string(), args))
    }
}
