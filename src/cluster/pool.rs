//! Connection pool: `N` connections per node id, round-robin `Get` (§4.1).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::connection::{Connection, Event, State};
use super::endpoint::Endpoint;
use super::node::NodeId;
use crate::error::{Error, Result};

struct Entry {
    endpoint: Endpoint,
    connections: Vec<Connection>,
    round_robin: AtomicUsize,
}

/// Connections to every node, indexed by node id. `num_conns_per_shard` is
/// fixed at construction (§3).
pub struct ConnectionPool {
    conns_per_node: usize,
    entries: HashMap<NodeId, Entry>,
}

impl ConnectionPool {
    /// `CONN_PER_SHARD = 0` selects a default of 1 effective connection
    /// (Open Question #1, resolved in SPEC_FULL §D.1).
    pub fn new(conns_per_node: usize) -> Self {
        Self {
            conns_per_node: conns_per_node.max(1),
            entries: HashMap::new(),
        }
    }

    /// Round-robin across the node's connections; returns only a
    /// `Connected` one, `None` if all are in another state.
    pub fn get(&self, node_id: &NodeId) -> Option<&Connection> {
        let entry = self.entries.get(node_id)?;
        if entry.connections.is_empty() {
            return None;
        }
        let len = entry.connections.len();
        for _ in 0..len {
            let idx = entry.round_robin.fetch_add(1, Ordering::Relaxed) % len;
            if entry.connections[idx].state == State::Connected {
                return Some(&entry.connections[idx]);
            }
        }
        None
    }

    /// Idempotent: if the endpoint (host+port) matches the existing pool
    /// entry, no-op. Otherwise replace the entire entry.
    pub fn add(&mut self, node_id: NodeId, endpoint: Endpoint, connect: bool) {
        if let Some(entry) = self.entries.get(&node_id) {
            if entry.endpoint.same_address(&endpoint) {
                return;
            }
        }

        let mut connections: Vec<Connection> = (0..self.conns_per_node)
            .map(|_| Connection::new(endpoint.clone()))
            .collect();

        if connect {
            for c in &mut connections {
                c.apply(Event::StartConnect);
            }
        }

        self.entries.insert(
            node_id,
            Entry {
                endpoint,
                connections,
                round_robin: AtomicUsize::new(0),
            },
        );
    }

    /// Delete the pool entry; in-flight commands against it must be failed
    /// with `TransportClosed` by the caller.
    pub fn disconnect(&mut self, node_id: &NodeId) -> bool {
        self.entries.remove(node_id).is_some()
    }

    /// Start every `Disconnected` connection across all nodes; idempotent
    /// for others. Returns the count of transitions.
    pub fn connect_all(&mut self) -> usize {
        let mut count = 0;
        for entry in self.entries.values_mut() {
            for c in &mut entry.connections {
                if c.state == State::Disconnected {
                    c.apply(Event::StartConnect);
                    count += 1;
                }
            }
        }
        count
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.entries.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver an event to every connection of `node_id` (used by the
    /// network layer to notify the pool of completions/failures).
    pub fn notify(&mut self, node_id: &NodeId, conn_index: usize, event: Event) -> Result<()> {
        let entry = self.entries.get_mut(node_id).ok_or(Error::NoConnection)?;
        let conn = entry
            .connections
            .get_mut(conn_index)
            .ok_or(Error::NoConnection)?;
        conn.apply(event);
        Ok(())
    }
}
