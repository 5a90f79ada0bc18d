//! Network endpoint for a cluster node.
//!
//! Grounded on the teacher's `backend::pool::Address`: an owned, cloneable
//! description of where to dial a peer, plus whatever credential material
//! is needed to authenticate once connected.

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{Error, Result};

/// `{host, port, optional unix-socket path, optional auth secret}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub unix_socket: Option<String>,
    #[serde(skip_serializing)]
    pub auth_secret: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            unix_socket: None,
            auth_secret: None,
        }
    }

    pub fn with_auth(mut self, secret: impl Into<String>) -> Self {
        self.auth_secret = Some(secret.into());
        self
    }

    pub fn with_unix_socket(mut self, path: impl Into<String>) -> Self {
        self.unix_socket = Some(path.into());
        self
    }

    /// Whether this endpoint matches another by host+port, the identity
    /// `Pool::Add` uses to decide no-op vs. replace (§4.1).
    pub fn same_address(&self, other: &Endpoint) -> bool {
        self.host.eq_ignore_ascii_case(&other.host) && self.port == other.port
    }

    pub fn resolve(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.to_socket_addrs()
            .map_err(|e| Error::Generic(format!("dns resolution failed for {addr}: {e}")))?
            .next()
            .ok_or_else(|| Error::Generic(format!("no addresses for {addr}")))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_address_is_case_insensitive_on_host() {
        let a = Endpoint::new("Node1.local", 7000);
        let b = Endpoint::new("node1.LOCAL", 7000);
        assert!(a.same_address(&b));
    }

    #[test]
    fn different_port_is_not_same_address() {
        let a = Endpoint::new("node1", 7000);
        let b = Endpoint::new("node1", 7001);
        assert!(!a.same_address(&b));
    }
}
