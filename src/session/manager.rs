// src/session/manager.rs

//! The `SessionManager` composes the handler with its local and remote sessions and
//! makes sure only one of them drives the handler at a time.

use super::local::{LocalClient, LocalSession};
use super::remote::RemoteSession;
use super::session_type::{SessionKind, SessionType};
use crate::core::engine::ProbeKey;
use crate::core::handler::CmdProcessor;
use crate::core::metrics;
use crate::core::{Handler, ProfCtlError, Request};
use std::time::Duration;
use tracing::{info, warn};

/// How often to poll while no session drives the handler.
pub const DORMANT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct SessionManager {
    handler: Handler,
    local: LocalSession,
    remote: Option<RemoteSession>,
    session_type: SessionType,
    is_alive: bool,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_handler(Handler::new())
    }

    pub fn with_handler(handler: Handler) -> Self {
        Self {
            handler,
            local: LocalSession::new(),
            remote: None,
            session_type: SessionType::Dormant,
            is_alive: false,
        }
    }

    /// Adds the remote session. It is started right away if the manager is already running.
    pub fn enable_remote_session(
        &mut self,
        host: impl Into<String>,
        port: u16,
    ) -> Result<(), ProfCtlError> {
        if self.remote.is_some() {
            return Err(ProfCtlError::RemoteSessionAlreadyEnabled);
        }
        let mut remote = RemoteSession::new(host, port);
        if self.is_alive {
            remote.start()?;
        }
        self.remote = Some(remote);
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), ProfCtlError> {
        self.local.start();
        if let Some(remote) = self.remote.as_mut() {
            remote.start()?;
        }
        self.is_alive = true;
        info!("session manager started");
        Ok(())
    }

    /// The single tick: local first, then remote, then the handler's own bookkeeping.
    pub fn poll(&mut self) {
        if !self.is_alive {
            return;
        }

        let can_accept = self.session_type.grants(SessionKind::Local);
        let local_active = self.local.poll(&mut self.handler, can_accept);
        self.transition(SessionKind::Local, local_active);

        let can_accept = self.session_type.grants(SessionKind::Remote);
        let handler = &mut self.handler;
        let remote_active = self
            .remote
            .as_mut()
            .map(|remote| remote.poll(handler, can_accept));
        if let Some(remote_active) = remote_active {
            self.transition(SessionKind::Remote, remote_active);
        }

        if !self.session_type.is_dormant() {
            self.handler.poll();
        }
    }

    /// Runs a request on the calling thread with no time limit.
    pub fn execute(&mut self, request: &mut Request) -> bool {
        let can_accept = self.session_type.grants(SessionKind::Local);
        let succeeded = self
            .local
            .execute(&mut self.handler, request, can_accept, Duration::ZERO);
        let local_active = self.local.is_alive(&self.handler);
        self.transition(SessionKind::Local, local_active);
        succeeded
    }

    pub fn poll_interval(&self) -> Duration {
        if self.session_type.is_dormant() {
            DORMANT_POLL_INTERVAL
        } else {
            self.handler.poll_interval()
        }
    }

    /// Tears everything down: remote client and listener, local queue, then the handler.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.shutdown(&mut self.handler);
            remote.close();
        }
        self.local.shutdown();
        self.handler.shutdown();
        if self.is_alive {
            info!("session manager shut down");
        }
        self.is_alive = false;
        self.set_session_type(SessionType::Dormant);
    }

    pub fn local_client(&self) -> LocalClient {
        self.local.client()
    }

    /// The remote listener's bound port, or 0 without a remote session.
    pub fn listener_port(&self) -> u16 {
        self.remote.as_ref().map_or(0, RemoteSession::listener_port)
    }

    pub fn is_profile_active(&self) -> bool {
        self.handler.is_profile_active()
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn register_probe(&mut self, key: ProbeKey) -> bool {
        self.handler.register_probe(key)
    }

    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        processor: CmdProcessor,
    ) -> Result<(), ProfCtlError> {
        self.handler.register_command(name, processor)
    }

    fn transition(&mut self, kind: SessionKind, active: bool) {
        let next = self.session_type.after_poll(kind, active);
        if active && next != SessionType::from(kind) {
            warn!("{} session is active without owning the profiler", kind);
        }
        self.set_session_type(next);
    }

    fn set_session_type(&mut self, next: SessionType) {
        if next != self.session_type {
            info!("session type {} -> {}", self.session_type, next);
            self.session_type = next;
        }
        metrics::SESSION_TYPE.set(next.gauge_value());
    }
}
