// src/lib.rs

//! profctl: the in-process control core of a low-latency profiler.
//!
//! A [`session::SessionManager`] arbitrates between in-process (local) control and a
//! single remote controller speaking a length-prefixed request/response protocol over
//! TCP. Both drive the same [`core::Handler`], which owns the one permitted collector.

pub mod config;
pub mod core;
pub mod server;
pub mod session;
pub mod transport;
