//! Closed error taxonomy shared across the coordinator.
//!
//! Every variant here is one of the kinds enumerated in the error handling
//! design: parse-time errors are fatal to the request, runtime errors are
//! subject to the timeout/OOM policy of the result-processor chain, and
//! connection errors never propagate synchronously to the caller.

use thiserror::Error;

/// The closed set of error kinds the coordinator can produce.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("ERR timeout")]
    TimedOut,

    #[error("ERR Used memory is higher than 'maxmemory'")]
    OutOfMemory,

    #[error("ERR parsing arguments: {0}")]
    ParseArgs(String),

    #[error("ERR syntax error: {0}")]
    Syntax(String),

    #[error("ERR limit exceeded: {0}")]
    Limit(String),

    #[error("ERR expression error: {0}")]
    Expr(String),

    #[error("ERR no such index")]
    NoIndex,

    #[error("ERR document not found")]
    NoDoc,

    #[error("WRONGTYPE key is not the correct type")]
    BadKeyType,

    #[error("ERR transport closed")]
    TransportClosed,

    #[error("ERR no route for key")]
    NoRoute,

    #[error("ERR no node available")]
    NoNode,

    #[error("ERR no connection available")]
    NoConnection,

    #[error("ERR {0}")]
    Generic(String),
}

impl Error {
    /// The textual reply prefix, as surfaced over the wire protocol (§6).
    pub fn prefix(&self) -> &'static str {
        match self {
            Error::TimedOut => "ERR timeout",
            Error::OutOfMemory => "ERR Used memory is higher than 'maxmemory'",
            Error::ParseArgs(_) => "ERR parsing arguments",
            Error::Syntax(_) => "ERR syntax error",
            Error::Limit(_) => "ERR limit exceeded",
            Error::Expr(_) => "ERR expression error",
            Error::NoIndex => "ERR no such index",
            Error::NoDoc => "ERR document not found",
            Error::BadKeyType => "WRONGTYPE",
            Error::TransportClosed => "ERR transport closed",
            Error::NoRoute => "ERR no route for key",
            Error::NoNode => "ERR no node available",
            Error::NoConnection => "ERR no connection available",
            Error::Generic(_) => "ERR",
        }
    }

    /// Whether this error is one that a `Return` timeout/OOM policy
    /// suppresses in favor of a partial-result flag (§4.8).
    pub fn is_policy_suppressible(&self) -> bool {
        matches!(self, Error::TimedOut | Error::OutOfMemory)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
