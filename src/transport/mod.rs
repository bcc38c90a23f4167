// src/transport/mod.rs

//! TCP plumbing for the remote session: a pollable listener, a non-blocking client
//! socket and the frame reassembly buffer.

mod framer;
mod listener;
mod socket;

pub use framer::Framer;
pub use listener::Listener;
pub use socket::{MAX_PENDING_OUTPUT, ReadStatus, Socket};
