// src/core/protocol/mod.rs

//! The length-prefixed wire protocol spoken with remote profiler controllers.

pub mod frame;
pub mod response;
pub use frame::{FrameCodec, HEADER_LEN, MAX_FRAME_LEN, MAX_REQUEST_LEN, encode_request_frame};
pub use response::{Response, ReturnCode, encode_response};
