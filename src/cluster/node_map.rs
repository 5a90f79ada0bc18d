//! Index of nodes by id and by host (§4.2).

use indexmap::IndexMap;

use super::node::{Node, NodeId};

/// Indexes nodes twice: by id (unique, insertion order preserved for
/// `IterateAll`) and is queried by host for locality (`IterateHost`).
#[derive(Debug, Default, Clone)]
pub struct NodeMap {
    by_id: IndexMap<NodeId, Node>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) {
        self.by_id.insert(node.id.clone(), node);
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<Node> {
        self.by_id.shift_remove(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.by_id.keys()
    }

    /// Yields every node once, in stable insertion order.
    pub fn iterate_all(&self) -> impl Iterator<Item = &Node> {
        self.by_id.values()
    }

    /// Yields only nodes whose endpoint host matches `host`,
    /// case-insensitively.
    pub fn iterate_host<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.by_id
            .values()
            .filter(move |n| n.endpoint.host.eq_ignore_ascii_case(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{endpoint::Endpoint, node::NodeFlags};

    fn node(id: &str, host: &str) -> Node {
        Node::new(NodeId::from(id), Endpoint::new(host, 7000), NodeFlags::empty())
    }

    #[test]
    fn iterate_all_preserves_insertion_order() {
        let mut map = NodeMap::new();
        map.insert(node("a", "h1"));
        map.insert(node("b", "h2"));
        map.insert(node("c", "h1"));
        let ids: Vec<_> = map.iterate_all().map(|n| n.id.0.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn iterate_host_is_case_insensitive_and_scoped() {
        let mut map = NodeMap::new();
        map.insert(node("a", "Host1"));
        map.insert(node("b", "host2"));
        map.insert(node("c", "HOST1"));
        let ids: Vec<_> = map.iterate_host("host1").map(|n| n.id.0.clone()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn remove_drops_from_id_index() {
        let mut map = NodeMap::new();
        map.insert(node("a", "h1"));
        assert!(map.remove(&NodeId::from("a")).is_some());
        assert!(!map.contains(&NodeId::from("a")));
    }
}
