// src/session/local.rs

//! In-process control of the profiler.
//!
//! Requests either run inline through `LocalSession::execute`, or are queued from any
//! thread through a `LocalClient` and run on the polling thread during the next poll.

use crate::core::metrics;
use crate::core::{Handler, ProfCtlError, Request};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Upper bound on queued requests serviced by a single poll.
const MAX_REQUESTS_PER_POLL: usize = 64;

/// A queued request together with the channel its completed form is returned on.
#[derive(Debug)]
struct LocalRequest {
    request: Request,
    reply: oneshot::Sender<Request>,
}

/// A cloneable, cross-thread handle for submitting requests to the local session.
#[derive(Debug, Clone)]
pub struct LocalClient {
    sender: mpsc::UnboundedSender<LocalRequest>,
}

impl LocalClient {
    /// Queues a request and waits for the polling thread to complete it.
    pub async fn execute(&self, request: Request) -> Result<Request, ProfCtlError> {
        let reply = self.submit(request)?;
        reply.await.map_err(|_| ProfCtlError::ShuttingDown)
    }

    /// Blocking variant of `execute` for threads outside any async runtime.
    pub fn blocking_execute(&self, request: Request) -> Result<Request, ProfCtlError> {
        let reply = self.submit(request)?;
        reply.blocking_recv().map_err(|_| ProfCtlError::ShuttingDown)
    }

    fn submit(&self, request: Request) -> Result<oneshot::Receiver<Request>, ProfCtlError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(LocalRequest { request, reply })
            .map_err(|_| ProfCtlError::ShuttingDown)?;
        Ok(receiver)
    }
}

#[derive(Debug)]
pub struct LocalSession {
    sender: mpsc::UnboundedSender<LocalRequest>,
    receiver: mpsc::UnboundedReceiver<LocalRequest>,
    started: bool,
    shut_down: bool,
    // Set when a request from this session started the running profile.
    owns_profile: bool,
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSession {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            started: false,
            shut_down: false,
            owns_profile: false,
        }
    }

    pub fn start(&mut self) {
        if !self.started && !self.shut_down {
            self.started = true;
            info!("local session started");
        }
    }

    pub fn client(&self) -> LocalClient {
        LocalClient {
            sender: self.sender.clone(),
        }
    }

    /// True while a profile begun by this session is still running.
    pub fn is_alive(&self, handler: &Handler) -> bool {
        self.owns_profile && handler.is_profile_active()
    }

    /// Services queued requests. Without permission they are answered with a busy error.
    /// Returns whether the session is active afterwards.
    pub fn poll(&mut self, handler: &mut Handler, can_accept_request: bool) -> bool {
        if self.started && !self.shut_down {
            for _ in 0..MAX_REQUESTS_PER_POLL {
                let Ok(LocalRequest { mut request, reply }) = self.receiver.try_recv() else {
                    break;
                };
                if can_accept_request {
                    self.run(handler, &mut request);
                } else {
                    request.reject(&busy());
                    handler.execute(&mut request);
                }
                if reply.send(request).is_err() {
                    debug!("local client went away before its reply was ready");
                }
            }
        }
        self.refresh(handler)
    }

    /// Runs one request inline. A zero `timeout` means no limit; exceeding a non-zero
    /// one is reported but does not fail the request. Returns whether it succeeded.
    pub fn execute(
        &mut self,
        handler: &mut Handler,
        request: &mut Request,
        can_accept_request: bool,
        timeout: Duration,
    ) -> bool {
        if self.shut_down {
            request.reject(&ProfCtlError::ShuttingDown);
            return handler.execute(request);
        }
        if !can_accept_request {
            request.reject(&busy());
            return handler.execute(request);
        }

        let started = Instant::now();
        let succeeded = self.run(handler, request);
        let elapsed = started.elapsed();
        if !timeout.is_zero() && elapsed > timeout {
            warn!(
                "local request '{}' took {:?}, exceeding its timeout of {:?}",
                request, elapsed, timeout
            );
        }
        succeeded
    }

    /// Answers every queued request with a shutdown error and stops accepting new ones.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.receiver.close();
        while let Ok(LocalRequest { mut request, reply }) = self.receiver.try_recv() {
            request.reject(&ProfCtlError::ShuttingDown);
            metrics::REQUESTS_FAILED_TOTAL.inc();
            let _ = reply.send(request);
        }
        self.owns_profile = false;
        info!("local session shut down");
    }

    fn run(&mut self, handler: &mut Handler, request: &mut Request) -> bool {
        let was_active = handler.is_profile_active();
        let succeeded = handler.execute(request);
        if !was_active && handler.is_profile_active() {
            self.owns_profile = true;
        }
        self.refresh(handler);
        succeeded
    }

    fn refresh(&mut self, handler: &Handler) -> bool {
        self.owns_profile &= handler.is_profile_active();
        self.owns_profile
    }
}

fn busy() -> ProfCtlError {
    ProfCtlError::SessionBusy("a remote session owns the profiler".to_string())
}
