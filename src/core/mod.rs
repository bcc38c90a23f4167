// src/core/mod.rs

//! The central module containing the engine-facing logic of the control core:
//! the command handler, requests, the wire protocol and the engine stand-ins.

pub mod engine;
pub mod errors;
pub mod handler;
pub mod metrics;
pub mod profile;
pub mod protocol;
pub mod request;

pub use errors::ProfCtlError;
pub use handler::Handler;
pub use profile::Profile;
pub use request::{Request, RequestParser};
