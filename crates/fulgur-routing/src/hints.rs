use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fulgur_core::{Amount, CltvExpiryDelta, NodeId, ShortChannelId};

use crate::graph::{ChannelDesc, GraphEdge, PublicChannel};
use crate::policy::{ChannelDirection, ChannelUpdate};

/// One hop of an invoice routing hint: just enough policy to traverse a
/// channel that is not (or not accurately) in the public graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraHop {
    /// The node the hinted channel starts from.
    pub node_id: NodeId,
    pub short_channel_id: ShortChannelId,
    pub fee_base: Amount,
    pub fee_proportional_millionths: u64,
    pub cltv_expiry_delta: CltvExpiryDelta,
}

/// A hinted channel resolved against the payment target: the hint hop
/// plus the node it forwards to.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistedChannel {
    pub extra_hop: ExtraHop,
    pub next_node: NodeId,
}

impl AssistedChannel {
    /// Synthesize the graph edge this hint stands for. Hints advertise no
    /// HTLC bounds, so the edge is maximally permissive.
    pub fn to_graph_edge(&self, timestamp: DateTime<Utc>) -> GraphEdge {
        let from = self.extra_hop.node_id;
        let to = self.next_node;
        GraphEdge {
            desc: ChannelDesc {
                short_channel_id: self.extra_hop.short_channel_id,
                from,
                to,
            },
            update: ChannelUpdate {
                short_channel_id: self.extra_hop.short_channel_id,
                timestamp,
                direction: ChannelDirection::of(&from, &to),
                cltv_expiry_delta: self.extra_hop.cltv_expiry_delta,
                htlc_minimum: Amount::ZERO,
                htlc_maximum: None,
                fee_base: self.extra_hop.fee_base,
                fee_proportional_millionths: self.extra_hop.fee_proportional_millionths,
            },
        }
    }
}

/// Resolve invoice hint sequences against the payment target.
///
/// Each hint lists hops from some publicly reachable node toward the
/// target; walking it right-to-left pins down the receiving node of every
/// hinted channel. A later hint wins on channel-id collision.
pub fn assisted_channels_from_hints(
    hints: &[Vec<ExtraHop>],
    target: &NodeId,
) -> HashMap<ShortChannelId, AssistedChannel> {
    let mut assisted = HashMap::new();
    for hint in hints {
        let mut next_node = *target;
        for hop in hint.iter().rev() {
            assisted.insert(
                hop.short_channel_id,
                AssistedChannel { extra_hop: hop.clone(), next_node },
            );
            next_node = hop.node_id;
        }
    }
    assisted
}

/// Expand a node blacklist into the set of directed edges touching any
/// blacklisted node, both directions of every channel, whether or not a
/// policy is currently known for them.
pub fn ignored_channel_descs<'a>(
    channels: impl IntoIterator<Item = &'a PublicChannel>,
    ignore_nodes: &HashSet<NodeId>,
) -> HashSet<ChannelDesc> {
    let mut descs = HashSet::new();
    for channel in channels {
        if ignore_nodes.contains(&channel.node1) || ignore_nodes.contains(&channel.node2) {
            descs.insert(ChannelDesc {
                short_channel_id: channel.short_channel_id,
                from: channel.node1,
                to: channel.node2,
            });
            descs.insert(ChannelDesc {
                short_channel_id: channel.short_channel_id,
                from: channel.node2,
                to: channel.node1,
            });
        }
    }
    descs
}
