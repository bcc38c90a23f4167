// src/session/mod.rs

//! The sessions that may drive the profiler and the manager that arbitrates between them.

pub mod local;
pub mod manager;
pub mod remote;
pub mod session_type;

pub use local::{LocalClient, LocalSession};
pub use manager::{DORMANT_POLL_INTERVAL, SessionManager};
pub use remote::RemoteSession;
pub use session_type::{SessionKind, SessionType};
