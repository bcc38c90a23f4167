// src/session/remote.rs

//! Control of the profiler by an external controller over TCP.
//!
//! The session owns a non-blocking listener and at most one client. Every poll reads
//! what the client has sent, executes each complete request and writes the responses
//! back. Any failure on the connection drops the client and ends the profile.

use crate::core::metrics;
use crate::core::protocol::{FrameCodec, HEADER_LEN, MAX_REQUEST_LEN, Response};
use crate::core::{Handler, ProfCtlError, RequestParser};
use crate::transport::{Framer, Listener, MAX_PENDING_OUTPUT, ReadStatus, Socket};
use bytes::BytesMut;
use std::fmt;
use tokio_util::codec::Encoder;
use tracing::{debug, info, warn};

pub const LISTENER_NAME: &str = "profctl";
const LISTENER_BLOCKING: bool = false;

const MAX_READS_PER_POLL: usize = 16;
const MAX_FRAMES_PER_POLL: usize = 64;
// Enough for one complete frame of the largest accepted size.
const MAX_BUFFERED_INPUT: usize = HEADER_LEN + MAX_REQUEST_LEN;

/// Why a client was dropped.
#[derive(Debug)]
enum ClientExit {
    Closed,
    Failed(ProfCtlError),
    Shutdown,
}

impl fmt::Display for ClientExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientExit::Closed => write!(f, "connection closed by peer"),
            ClientExit::Failed(e) => write!(f, "{e}"),
            ClientExit::Shutdown => write!(f, "framework is going down"),
        }
    }
}

impl From<ProfCtlError> for ClientExit {
    fn from(e: ProfCtlError) -> Self {
        ClientExit::Failed(e)
    }
}

impl From<std::io::Error> for ClientExit {
    fn from(e: std::io::Error) -> Self {
        ClientExit::Failed(e.into())
    }
}

#[derive(Debug)]
pub struct RemoteSession {
    listener: Listener,
    client: Option<Socket>,
    framer: Framer,
    parser: RequestParser,
    codec: FrameCodec,
}

impl RemoteSession {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            listener: Listener::new(LISTENER_NAME, LISTENER_BLOCKING, host, port),
            client: None,
            framer: Framer::new(),
            parser: RequestParser::new(),
            codec: FrameCodec::new(),
        }
    }

    /// Binds the listener.
    pub fn start(&mut self) -> Result<(), ProfCtlError> {
        self.listener
            .start()
            .map_err(|e| ProfCtlError::ListenerStart {
                listener: self.listener.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn listener_port(&self) -> u16 {
        self.listener.port()
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn is_alive(&self) -> bool {
        self.client.is_some()
    }

    /// Services the connected client, or accepts a new one when permitted.
    /// Returns whether a client is connected afterwards.
    pub fn poll(&mut self, handler: &mut Handler, can_accept_request: bool) -> bool {
        if self.client.is_some() {
            self.refuse_pending();
        } else if can_accept_request {
            self.accept_client();
        }

        if self.client.is_some()
            && let Err(exit) = self.exchange(handler)
        {
            self.reset_client(handler, exit);
        }
        self.is_alive()
    }

    /// Drops the client, ending its profile. No-op without a client. Idempotent.
    pub fn shutdown(&mut self, handler: &mut Handler) {
        if self.client.is_none() {
            return;
        }
        info!("remote session - framework is going down");
        self.reset_client(handler, ClientExit::Shutdown);
    }

    /// Stops listening for new controllers. Used once the framework is going down.
    pub fn close(&mut self) {
        self.listener.stop();
    }

    fn accept_client(&mut self) {
        match self.listener.accept() {
            Ok(Some(socket)) => {
                info!("remote session - accepted client {}", socket.peer_addr());
                metrics::REMOTE_CLIENTS_ACCEPTED_TOTAL.inc();
                self.framer.reset();
                self.client = Some(socket);
            }
            Ok(None) => {}
            Err(e) => warn!("remote session - failed to accept on {}: {}", self.listener, e),
        }
    }

    /// Closes connections that arrive while a client is already connected.
    fn refuse_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok(Some(socket)) => {
                    warn!(
                        "remote session - refusing {}, a client is already connected",
                        socket.peer_addr()
                    );
                    metrics::REMOTE_CLIENTS_REJECTED_TOTAL.inc();
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("remote session - failed to accept on {}: {}", self.listener, e);
                    break;
                }
            }
        }
    }

    /// Reads, executes and answers. Any error ends the connection.
    fn exchange(&mut self, handler: &mut Handler) -> Result<(), ClientExit> {
        let Some(socket) = self.client.as_mut() else {
            return Ok(());
        };

        // Deliver earlier responses before taking more requests from the client.
        socket.flush()?;
        if socket.is_backlogged() {
            debug!(
                "remote session - {} bytes pending for {}, not reading",
                socket.pending_output(),
                socket.peer_addr()
            );
            return Ok(());
        }

        let mut closed = false;
        for _ in 0..MAX_READS_PER_POLL {
            if self.framer.buffered() >= MAX_BUFFERED_INPUT {
                break;
            }
            match self.framer.read_from(socket)? {
                ReadStatus::Data(n) => debug!("remote session - read {} bytes", n),
                ReadStatus::WouldBlock => break,
                ReadStatus::Closed => {
                    closed = true;
                    break;
                }
            }
        }

        let mut encoded = BytesMut::new();
        let mut violation = None;
        for _ in 0..MAX_FRAMES_PER_POLL {
            if socket.pending_output() + encoded.len() >= MAX_PENDING_OUTPUT {
                break;
            }
            let frame = match self.framer.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    // The stream cannot be resynchronized. Answer with the reason, then drop it.
                    self.codec.encode(Response::failure(e.to_string()), &mut encoded)?;
                    violation = Some(e);
                    break;
                }
            };
            metrics::FRAMES_RECEIVED_TOTAL.inc();

            let mut request = self.parser.parse(&frame);
            handler.execute(&mut request);
            self.codec.encode(Response::from(&request), &mut encoded)?;
        }
        socket.queue(&encoded);
        socket.flush()?;

        if let Some(e) = violation {
            return Err(ClientExit::Failed(e));
        }
        if closed {
            return Err(ClientExit::Closed);
        }
        Ok(())
    }

    /// Restores a quiescent state: ends an active profile, drops the socket and discards
    /// any partially received frame.
    fn reset_client(&mut self, handler: &mut Handler, exit: ClientExit) {
        if let Some(socket) = self.client.take() {
            match &exit {
                ClientExit::Failed(_) => warn!(
                    "remote session - dropping client {}: {}",
                    socket.peer_addr(),
                    exit
                ),
                _ => info!(
                    "remote session - client {} disconnected: {}",
                    socket.peer_addr(),
                    exit
                ),
            }
        }
        if handler.is_profile_active() {
            let status = handler.end_profile();
            debug!("remote session - {}", status);
        }
        self.framer.reset();
    }
}
