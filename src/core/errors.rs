// src/core/errors.rs

//! Defines the primary error type for the profiler control core.

use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the control core.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum ProfCtlError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("framework init error - Failed to start listener {listener}: {reason}")]
    ListenerStart { listener: String, reason: String },

    #[error("Remote sessions already supported")]
    RemoteSessionAlreadyEnabled,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame of {0} bytes exceeds the protocol limit")]
    FrameTooLarge(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("Missing argument '--{arg}' for '{command}'")]
    MissingArgument { command: String, arg: String },

    #[error("Invalid value '{value}' for argument '--{arg}'")]
    InvalidArgument { arg: String, value: String },

    #[error("Value is not an integer or out of range")]
    NotAnInteger,

    #[error("failed to begin profile - a profile is already active")]
    ProfileAlreadyActive,

    #[error("Invalid profile settings: {0}")]
    InvalidProfile(String),

    #[error("Probe not found: {0}")]
    ProbeNotFound(String),

    #[error("Invalid PMU request: {0}")]
    InvalidPmuRequest(String),

    #[error("Session busy: {0}")]
    SessionBusy(String),

    #[error("Profiler is shutting down")]
    ShuttingDown,

    #[error("Internal Error: {0}")]
    Internal(String),
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ProfCtlError {
    fn clone(&self) -> Self {
        match self {
            ProfCtlError::Io(e) => ProfCtlError::Io(Arc::clone(e)),
            ProfCtlError::ListenerStart { listener, reason } => ProfCtlError::ListenerStart {
                listener: listener.clone(),
                reason: reason.clone(),
            },
            ProfCtlError::RemoteSessionAlreadyEnabled => ProfCtlError::RemoteSessionAlreadyEnabled,
            ProfCtlError::InvalidFrame(s) => ProfCtlError::InvalidFrame(s.clone()),
            ProfCtlError::FrameTooLarge(n) => ProfCtlError::FrameTooLarge(*n),
            ProfCtlError::InvalidRequest(s) => ProfCtlError::InvalidRequest(s.clone()),
            ProfCtlError::UnknownCommand(s) => ProfCtlError::UnknownCommand(s.clone()),
            ProfCtlError::DuplicateCommand(s) => ProfCtlError::DuplicateCommand(s.clone()),
            ProfCtlError::MissingArgument { command, arg } => ProfCtlError::MissingArgument {
                command: command.clone(),
                arg: arg.clone(),
            },
            ProfCtlError::InvalidArgument { arg, value } => ProfCtlError::InvalidArgument {
                arg: arg.clone(),
                value: value.clone(),
            },
            ProfCtlError::NotAnInteger => ProfCtlError::NotAnInteger,
            ProfCtlError::ProfileAlreadyActive => ProfCtlError::ProfileAlreadyActive,
            ProfCtlError::InvalidProfile(s) => ProfCtlError::InvalidProfile(s.clone()),
            ProfCtlError::ProbeNotFound(s) => ProfCtlError::ProbeNotFound(s.clone()),
            ProfCtlError::InvalidPmuRequest(s) => ProfCtlError::InvalidPmuRequest(s.clone()),
            ProfCtlError::SessionBusy(s) => ProfCtlError::SessionBusy(s.clone()),
            ProfCtlError::ShuttingDown => ProfCtlError::ShuttingDown,
            ProfCtlError::Internal(s) => ProfCtlError::Internal(s.clone()),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ProfCtlError {
    fn from(e: std::io::Error) -> Self {
        ProfCtlError::Io(Arc::new(e))
    }
}

impl From<ParseIntError> for ProfCtlError {
    fn from(_: ParseIntError) -> Self {
        ProfCtlError::NotAnInteger
    }
}

impl From<std::str::Utf8Error> for ProfCtlError {
    fn from(e: std::str::Utf8Error) -> Self {
        ProfCtlError::InvalidRequest(format!("request is not valid UTF-8: {e}"))
    }
}

impl From<serde_json::Error> for ProfCtlError {
    fn from(e: serde_json::Error) -> Self {
        ProfCtlError::Internal(format!("JSON serialization error: {e}"))
    }
}
