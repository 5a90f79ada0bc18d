//! Cluster node: a stable identity plus an endpoint and role flags.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::endpoint::Endpoint;

bitflags_like::bitflags! {
    /// `{Master, Self, Coordinator}` (§3). Represented as a plain bitset
    /// rather than `bitflags!` macro-generated type, since the teacher's
    /// codebase favors small hand-rolled flag sets over pulling in the
    /// `bitflags` crate for a three-value set.
    pub struct NodeFlags: u8 {
        const MASTER = 0b001;
        const SELF_ = 0b010;
        const COORDINATOR = 0b100;
    }
}

/// A stable, opaque node identifier. Valid only while present in the
/// current topology (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

/// `{id, endpoint, flags}` (§3).
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub endpoint: Endpoint,
    pub flags: NodeFlags,
}

impl Node {
    pub fn new(id: NodeId, endpoint: Endpoint, flags: NodeFlags) -> Self {
        Self { id, endpoint, flags }
    }

    pub fn is_master(&self) -> bool {
        self.flags.contains(NodeFlags::MASTER)
    }

    pub fn is_self(&self) -> bool {
        self.flags.contains(NodeFlags::SELF_)
    }

    pub fn is_coordinator(&self) -> bool {
        self.flags.contains(NodeFlags::COORDINATOR)
    }
}

/// A tiny hand-rolled bitset, in the spirit of the teacher's preference for
/// small local types over a macro-generated crate dependency for a 3-bit
/// flag set.
mod bitflags_like {
    macro_rules! bitflags {
        (
            $(#[$meta:meta])*
            pub struct $name:ident: $ty:ty {
                $(const $flag:ident = $value:expr;)*
            }
        ) => {
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
            pub struct $name(pub $ty);

            impl $name {
                $(pub const $flag: $name = $name($value);)*

                pub const fn empty() -> Self {
                    $name(0)
                }

                pub fn contains(&self, other: $name) -> bool {
                    (self.0 & other.0) == other.0
                }

                pub fn insert(&mut self, other: $name) {
                    self.0 |= other.0;
                }

                pub fn remove(&mut self, other: $name) {
                    self.0 &= !other.0;
                }
            }

            impl std::ops::BitOr for $name {
                type Output = $name;
                fn bitor(self, rhs: $name) -> $name {
                    $name(self.0 | rhs.0)
                }
            }
        };
    }
    pub(crate) use bitflags;
}
