// src/core/request/mod.rs

//! Requests executed against the profiler, whether they arrive over the wire or
//! from within the process.

mod parser;

pub use parser::RequestParser;

use crate::core::ProfCtlError;
use std::fmt;
use std::str::FromStr;

/// The result of executing a request: a response payload or an error payload, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(String),
    Errors(String),
}

/// The `--key value` options of a request, in the order they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    options: Vec<(String, String)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.push((key.into(), value.into()));
    }

    /// Returns the first value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, command: &str, key: &str) -> Result<&str, ProfCtlError> {
        self.get(key).ok_or_else(|| ProfCtlError::MissingArgument {
            command: command.to_string(),
            arg: key.to_string(),
        })
    }

    /// Parses a mandatory argument into `T`.
    pub fn parse<T: FromStr>(&self, command: &str, key: &str) -> Result<T, ProfCtlError> {
        let value = self.require(command, key)?;
        value.parse::<T>().map_err(|_| ProfCtlError::InvalidArgument {
            arg: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// One request and, once executed, its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    args: Arguments,
    outcome: Option<Outcome>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Arguments::new(),
            outcome: None,
        }
    }

    /// Builder-style helper for in-process callers.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(key, value.to_string());
        self
    }

    pub(crate) fn from_parts(command: String, args: Arguments) -> Self {
        Self {
            command,
            args,
            outcome: None,
        }
    }

    /// A request that failed before it could be executed, e.g. because it did not parse.
    pub fn rejected(errors: impl Into<String>) -> Self {
        Self {
            command: String::new(),
            args: Arguments::new(),
            outcome: Some(Outcome::Errors(errors.into())),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn response(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Response(payload)) => Some(payload),
            _ => None,
        }
    }

    pub fn errors(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Errors(errors)) => Some(errors),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records the result of running the request.
    pub fn complete(&mut self, result: Result<String, ProfCtlError>) {
        self.outcome = Some(match result {
            Ok(payload) => Outcome::Response(payload),
            Err(e) => Outcome::Errors(e.to_string()),
        });
    }

    pub fn reject(&mut self, error: &ProfCtlError) {
        self.outcome = Some(Outcome::Errors(error.to_string()));
    }
}

impl fmt::Display for Request {
    /// Renders the request in its wire grammar: `<command> [--key value]...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for (key, value) in self.args.iter() {
            write!(f, " --{key} {value}")?;
        }
        Ok(())
    }
}
