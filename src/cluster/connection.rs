//! Per-node connection and its reconnect/reauth state machine (§4.1).

use std::time::Duration;
use tracing::{debug, warn};

use super::endpoint::Endpoint;

pub const RECONNECT_TIMEOUT: Duration = Duration::from_millis(500);
pub const RE_AUTH_TIMEOUT: Duration = Duration::from_millis(500);

/// Connection state (§3 "Connection pool entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Connecting,
    Reauthenticating,
    Connected,
    Freeing,
}

/// Events the state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    StartConnect,
    ConnectDoneOk,
    ConnectDoneErr,
    AuthReplyOk,
    AuthReplyErr,
    TimerFire,
    DisconnectNotify,
    StopRequest,
}

/// One logical full-duplex connection to a node.
#[derive(Debug, Clone)]
pub struct Connection {
    pub endpoint: Endpoint,
    pub state: State,
    /// Cached protocol version, renegotiated lazily with a `HELLO` frame
    /// when a command needs a different one (§4.1).
    pub protocol_version: Option<u32>,
    pending_upgrade: Option<u32>,
    reconnect_timer: Option<Duration>,
}

impl Connection {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            state: State::Disconnected,
            protocol_version: None,
            pending_upgrade: None,
            reconnect_timer: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    fn has_auth(&self) -> bool {
        self.endpoint.auth_secret.is_some()
    }

    /// Apply one event to the state machine, following the transition
    /// table in §4.1 exactly.
    pub fn apply(&mut self, event: Event) {
        use Event::*;
        use State::*;

        self.state = match (self.state, event) {
            (Disconnected, StartConnect) => {
                debug!(endpoint = %self.endpoint, "connecting");
                Connecting
            }
            (Connecting, ConnectDoneOk) if !self.has_auth() => Connected,
            (Connecting, ConnectDoneOk) => {
                // has auth: stay Connecting (inner: auth), AUTH is sent by
                // the caller upon observing this transition.
                Connecting
            }
            (Connecting, AuthReplyOk) => Connected,
            (Connecting, AuthReplyErr) => {
                warn!(endpoint = %self.endpoint, "auth failed, scheduling reauth");
                self.reconnect_timer = Some(RE_AUTH_TIMEOUT);
                Reauthenticating
            }
            (Connecting, ConnectDoneErr) => {
                self.reconnect_timer = Some(RECONNECT_TIMEOUT);
                Connecting
            }
            (Reauthenticating, TimerFire) => Connecting,
            (_, DisconnectNotify) => {
                self.reconnect_timer = Some(RECONNECT_TIMEOUT);
                Connecting
            }
            (_, StopRequest) => {
                self.reconnect_timer = None;
                Freeing
            }
            (state, _) => state,
        };
    }

    pub fn reconnect_delay(&self) -> Option<Duration> {
        self.reconnect_timer
    }

    /// Queue a protocol upgrade to be negotiated before the next command
    /// send (§4.1 "Protocol version is negotiated lazily").
    pub fn request_protocol_upgrade(&mut self, version: u32) {
        if self.protocol_version != Some(version) {
            self.pending_upgrade = Some(version);
        }
    }

    pub fn take_pending_upgrade(&mut self) -> Option<u32> {
        self.pending_upgrade.take()
    }

    pub fn complete_upgrade(&mut self, version: u32) {
        self.protocol_version = Some(version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connects_without_auth() {
        let mut c = Connection::new(Endpoint::new("h", 1));
        c.apply(Event::StartConnect);
        assert_eq!(c.state, State::Connecting);
        c.apply(Event::ConnectDoneOk);
        assert_eq!(c.state, State::Connected);
    }

    #[test]
    fn connects_with_auth_goes_through_auth_reply() {
        let mut c = Connection::new(Endpoint::new("h", 1).with_auth("secret"));
        c.apply(Event::StartConnect);
        c.apply(Event::ConnectDoneOk);
        assert_eq!(c.state, State::Connecting);
        c.apply(Event::AuthReplyOk);
        assert_eq!(c.state, State::Connected);
    }

    #[test]
    fn auth_failure_arms_reauth_timer() {
        let mut c = Connection::new(Endpoint::new("h", 1).with_auth("secret"));
        c.apply(Event::StartConnect);
        c.apply(Event::ConnectDoneOk);
        c.apply(Event::AuthReplyErr);
        assert_eq!(c.state, State::Reauthenticating);
        assert_eq!(c.reconnect_delay(), Some(RE_AUTH_TIMEOUT));
        c.apply(Event::TimerFire);
        assert_eq!(c.state, State::Connecting);
    }

    #[test]
    fn connect_error_arms_reconnect_timer_and_stays_connecting() {
        let mut c = Connection::new(Endpoint::new("h", 1));
        c.apply(Event::StartConnect);
        c.apply(Event::ConnectDoneErr);
        assert_eq!(c.state, State::Connecting);
        assert_eq!(c.reconnect_delay(), Some(RECONNECT_TIMEOUT));
    }

    #[test]
    fn disconnect_from_any_state_reconnects() {
        let mut c = Connection::new(Endpoint::new("h", 1));
        c.apply(Event::StartConnect);
        c.apply(Event::ConnectDoneOk);
        assert_eq!(c.state, State::Connected);
        c.apply(Event::DisconnectNotify);
        assert_eq!(c.state, State::Connecting);
    }

    #[test]
    fn stop_request_frees_from_any_state() {
        let mut c = Connection::new(Endpoint::new("h", 1));
        c.apply(Event::StopRequest);
        assert_eq!(c.state, State::Freeing);
    }
}
