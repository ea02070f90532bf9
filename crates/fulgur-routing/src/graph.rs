use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fulgur_core::{NodeId, ShortChannelId};

use crate::policy::{ChannelDirection, ChannelUpdate};

/// A directed edge key. One channel id appears at most twice in a graph,
/// once per direction; several channel ids may connect the same ordered
/// pair of nodes (parallel channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelDesc {
    pub short_channel_id: ShortChannelId,
    pub from: NodeId,
    pub to: NodeId,
}

/// A directed edge: its key plus the relay policy currently in force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub desc: ChannelDesc,
    pub update: ChannelUpdate,
}

impl GraphEdge {
    /// An edge is well formed when its endpoints agree with the update's
    /// direction bit under the lexicographic node order.
    pub fn direction_consistent(&self) -> bool {
        ChannelDirection::of(&self.desc.from, &self.desc.to) == self.update.direction
    }
}

/// An announced channel together with whichever directional policies have
/// been seen for it. `node1` is the lexicographically smaller endpoint;
/// `update1` governs `node1 -> node2` and `update2` the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicChannel {
    pub short_channel_id: ShortChannelId,
    pub node1: NodeId,
    pub node2: NodeId,
    pub update1: Option<ChannelUpdate>,
    pub update2: Option<ChannelUpdate>,
}

impl PublicChannel {
    /// The directed edges this channel currently contributes: zero, one or
    /// two depending on which directional policies are known.
    pub fn edges(&self) -> Vec<GraphEdge> {
        let mut edges = Vec::with_capacity(2);
        if let Some(update) = &self.update1 {
            edges.push(GraphEdge {
                desc: ChannelDesc {
                    short_channel_id: self.short_channel_id,
                    from: self.node1,
                    to: self.node2,
                },
                update: update.clone(),
            });
        }
        if let Some(update) = &self.update2 {
            edges.push(GraphEdge {
                desc: ChannelDesc {
                    short_channel_id: self.short_channel_id,
                    from: self.node2,
                    to: self.node1,
                },
                update: update.clone(),
            });
        }
        edges
    }
}

/// A directed multigraph of payment channels.
///
/// Keeps both outgoing and incoming adjacency: route searches walk the
/// graph backward from the payment target, so the incoming lists are the
/// hot path. Adjacency lists preserve insertion order, which is what makes
/// tie-breaking between equally good channels reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectedGraph {
    outgoing: HashMap<NodeId, Vec<GraphEdge>>,
    incoming: HashMap<NodeId, Vec<GraphEdge>>,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a snapshot of announced channels. Channels are
    /// folded in channel-id order so two snapshots with the same content
    /// produce identical adjacency lists.
    pub fn from_channels(channels: &[PublicChannel]) -> Self {
        let mut sorted: Vec<&PublicChannel> = channels.iter().collect();
        sorted.sort_by_key(|c| c.short_channel_id);

        let mut graph = Self::new();
        for channel in sorted {
            for edge in channel.edges() {
                graph.add_edge(edge);
            }
        }
        graph
    }

    pub fn add_vertex(&mut self, node: NodeId) {
        self.outgoing.entry(node).or_default();
        self.incoming.entry(node).or_default();
    }

    /// Remove a vertex. Refuses (returns `false`) unless the vertex has no
    /// remaining edges in either direction.
    pub fn remove_vertex(&mut self, node: &NodeId) -> bool {
        let isolated = self.outgoing.get(node).map_or(true, Vec::is_empty)
            && self.incoming.get(node).map_or(true, Vec::is_empty);
        if !isolated {
            return false;
        }
        self.outgoing.remove(node);
        self.incoming.remove(node);
        true
    }

    /// Insert an edge, replacing any previous edge with the same desc.
    /// Both endpoints are added to the vertex set if missing. Returns the
    /// replaced edge, if any.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Option<GraphEdge> {
        self.add_vertex(edge.desc.from);
        self.add_vertex(edge.desc.to);

        let replaced = Self::insert_into(self.outgoing.entry(edge.desc.from).or_default(), edge.clone());
        Self::insert_into(self.incoming.entry(edge.desc.to).or_default(), edge);
        replaced
    }

    fn insert_into(list: &mut Vec<GraphEdge>, edge: GraphEdge) -> Option<GraphEdge> {
        match list.iter_mut().find(|e| e.desc == edge.desc) {
            Some(existing) => Some(std::mem::replace(existing, edge)),
            None => {
                list.push(edge);
                None
            }
        }
    }

    /// Remove exactly the directed edge under `desc`; endpoints stay in
    /// the vertex set. Returns the removed edge, if any.
    pub fn remove_edge(&mut self, desc: &ChannelDesc) -> Option<GraphEdge> {
        let removed = self
            .outgoing
            .get_mut(&desc.from)
            .and_then(|list| Self::take_from(list, desc));
        if removed.is_some() {
            if let Some(list) = self.incoming.get_mut(&desc.to) {
                Self::take_from(list, desc);
            }
        }
        removed
    }

    fn take_from(list: &mut Vec<GraphEdge>, desc: &ChannelDesc) -> Option<GraphEdge> {
        let position = list.iter().position(|e| &e.desc == desc)?;
        Some(list.remove(position))
    }

    pub fn contains_vertex(&self, node: &NodeId) -> bool {
        self.outgoing.contains_key(node)
    }

    pub fn contains_edge(&self, desc: &ChannelDesc) -> bool {
        self.outgoing
            .get(&desc.from)
            .map_or(false, |list| list.iter().any(|e| &e.desc == desc))
    }

    pub fn outgoing(&self, node: &NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.outgoing.get(node).into_iter().flatten()
    }

    pub fn incoming(&self, node: &NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.incoming.get(node).into_iter().flatten()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &NodeId> {
        self.outgoing.keys()
    }

    pub fn vertex_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }
}
