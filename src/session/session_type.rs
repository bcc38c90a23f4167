// src/session/session_type.rs

//! Arbitration between the local and remote sessions, as pure transitions on `SessionType`.

use strum_macros::{Display, IntoStaticStr};

/// Which session currently drives the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SessionType {
    #[default]
    Dormant,
    Local,
    Remote,
}

/// The two kinds of session that compete for the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionKind {
    Local,
    Remote,
}

impl From<SessionKind> for SessionType {
    fn from(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Local => SessionType::Local,
            SessionKind::Remote => SessionType::Remote,
        }
    }
}

impl SessionType {
    /// Whether a session of `kind` may accept new work in this state.
    pub fn grants(self, kind: SessionKind) -> bool {
        self == SessionType::Dormant || self == SessionType::from(kind)
    }

    /// The state after polling a session of `kind` that reported `active`.
    ///
    /// A session only takes over when it was granted permission, and only the session
    /// that owns the handler can hand it back.
    pub fn after_poll(self, kind: SessionKind, active: bool) -> SessionType {
        let owner = SessionType::from(kind);
        match (active, self.grants(kind)) {
            (true, true) => owner,
            (false, _) if self == owner => SessionType::Dormant,
            _ => self,
        }
    }

    /// One full tick: the local session is evaluated before the remote one, so local
    /// wins when both could become active at once.
    pub fn resolve(self, local_active: bool, remote_active: bool) -> SessionType {
        self.after_poll(SessionKind::Local, local_active)
            .after_poll(SessionKind::Remote, remote_active)
    }

    pub fn is_dormant(self) -> bool {
        self == SessionType::Dormant
    }

    /// Value exported through the session type gauge.
    pub fn gauge_value(self) -> f64 {
        match self {
            SessionType::Dormant => 0.0,
            SessionType::Local => 1.0,
            SessionType::Remote => 2.0,
        }
    }
}
