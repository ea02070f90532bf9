use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use fulgur_core::{Amount, BlockHeight, NodeId, ShortChannelId};

use crate::error::RouteError;
use crate::graph::{ChannelDesc, DirectedGraph, GraphEdge};
use crate::weight::{edge_weight, RichWeight, WeightRatios};

/// Hard upper bound on route length, whatever a query asks for.
pub const MAX_ROUTE_LENGTH: u32 = 20;

/// Per-search blacklists. Everything here is scoped to one search; the
/// graph itself is never mutated.
#[derive(Debug, Clone, Default)]
pub struct Ignored {
    /// Specific directed edges to skip.
    pub edges: HashSet<ChannelDesc>,
    /// Nodes that must not appear on the path.
    pub vertices: HashSet<NodeId>,
    /// Channels to skip in both directions.
    pub channels: HashSet<ShortChannelId>,
}

impl Ignored {
    pub fn none() -> Self {
        Self::default()
    }

    fn allows(&self, edge: &GraphEdge) -> bool {
        !self.edges.contains(&edge.desc)
            && !self.channels.contains(&edge.desc.short_channel_id)
            && !self.vertices.contains(&edge.desc.from)
    }
}

/// Hard per-search caps on path shape. `max_length` is clamped to
/// [`MAX_ROUTE_LENGTH`] no matter what the caller asks for.
#[derive(Debug, Clone, Copy)]
pub struct SearchBounds {
    max_length: u32,
    max_cltv: u32,
}

impl SearchBounds {
    pub fn new(max_length: u32, max_cltv: u32) -> Self {
        Self { max_length: max_length.min(MAX_ROUTE_LENGTH), max_cltv }
    }

    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    pub fn admits(&self, weight: &RichWeight) -> bool {
        weight.length <= self.max_length && weight.cltv <= self.max_cltv
    }
}

/// Inputs shared by every edge relaxation of one search.
#[derive(Debug, Clone, Copy)]
pub struct WeightContext {
    /// Current chain tip, read by the channel-age heuristic.
    pub current_block: BlockHeight,
    /// Multi-factor heuristic; `None` means pure fee cost.
    pub ratios: Option<WeightRatios>,
}

/// Cooperative cancellation flag. The search checks it once per
/// priority-queue pop and aborts with [`RouteError::Cancelled`]; no
/// partial route is ever returned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

/// A path found by the search: edges in source-to-target order plus the
/// accumulator that reached the source.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPath {
    pub edges: Vec<GraphEdge>,
    pub weight: RichWeight,
}

impl WeightedPath {
    /// The channel-id sequence of the path, used as its identity.
    pub fn channel_ids(&self) -> impl Iterator<Item = ShortChannelId> + '_ {
        self.edges.iter().map(|e| e.desc.short_channel_id)
    }
}

/// One priority-queue entry: a vertex and the accumulator it was pushed
/// with. `via` is the channel that reached the vertex, kept as the last
/// tie-breaker so pops are reproducible.
#[derive(Debug, Clone)]
struct SearchEntry {
    node: NodeId,
    weight: RichWeight,
    via: Option<ShortChannelId>,
}

impl PartialEq for SearchEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchEntry {}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap and the search wants the lightest entry
        // first, so the comparison is reversed.
        other
            .weight
            .weight
            .total_cmp(&self.weight.weight)
            .then_with(|| other.weight.length.cmp(&self.weight.length))
            .then_with(|| other.via.cmp(&self.via))
    }
}

/// Modified Dijkstra from `target` backward to `source`.
///
/// Searching against the payment direction means every relaxation knows
/// the exact amount that will leave the candidate vertex, so the upstream
/// fee is computed on the right value.
///
/// `extra_edges` supersede same-desc graph edges for this search only.
/// `boundary` is an additional caller-supplied filter on the accumulator.
///
/// Returns `Ok(None)` when no feasible path exists under the constraints.
#[allow(clippy::too_many_arguments)]
pub fn shortest_path(
    graph: &DirectedGraph,
    source: &NodeId,
    target: &NodeId,
    amount: Amount,
    ignored: &Ignored,
    extra_edges: &[GraphEdge],
    bounds: SearchBounds,
    boundary: &dyn Fn(&RichWeight) -> bool,
    ctx: &WeightContext,
    cancel: Option<&CancelToken>,
) -> Result<Option<WeightedPath>, RouteError> {
    if source == target {
        return Err(RouteError::CannotRouteToSelf);
    }

    let mut hinted_in: HashMap<NodeId, Vec<&GraphEdge>> = HashMap::new();
    let mut superseded: HashSet<ChannelDesc> = HashSet::new();
    for edge in extra_edges {
        superseded.insert(edge.desc);
        hinted_in.entry(edge.desc.to).or_default().push(edge);
    }

    let mut best: HashMap<NodeId, RichWeight> = HashMap::new();
    let mut predecessor: HashMap<NodeId, GraphEdge> = HashMap::new();
    let mut settled: HashSet<NodeId> = HashSet::new();
    let mut queue: BinaryHeap<SearchEntry> = BinaryHeap::new();

    let start = RichWeight::at_target(amount);
    best.insert(*target, start);
    queue.push(SearchEntry { node: *target, weight: start, via: None });

    while let Some(entry) = queue.pop() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(RouteError::Cancelled);
        }
        if !settled.insert(entry.node) {
            // Stale entry: the vertex was already settled with a better key.
            continue;
        }
        if entry.node == *source {
            break;
        }

        let from_graph = graph
            .incoming(&entry.node)
            .filter(|edge| !superseded.contains(&edge.desc));
        let from_hints = hinted_in.get(&entry.node).into_iter().flatten().copied();

        for edge in from_graph.chain(from_hints) {
            let from = edge.desc.from;
            if from == edge.desc.to || settled.contains(&from) {
                continue;
            }
            if !ignored.allows(edge) {
                continue;
            }
            if !edge.update.can_carry(entry.weight.cost) {
                continue;
            }

            let from_source = from == *source;
            let Some(next) =
                edge_weight(edge, &entry.weight, from_source, ctx.current_block, ctx.ratios.as_ref())
            else {
                continue;
            };
            if !bounds.admits(&next) || !boundary(&next) {
                continue;
            }

            let improved = best.get(&from).map_or(true, |known| next.weight < known.weight);
            if improved {
                best.insert(from, next);
                predecessor.insert(from, edge.clone());
                queue.push(SearchEntry {
                    node: from,
                    weight: next,
                    via: Some(edge.desc.short_channel_id),
                });
            }
        }
    }

    if !settled.contains(source) {
        return Ok(None);
    }
    let Some(weight) = best.get(source).copied() else {
        return Ok(None);
    };

    // Walk the predecessor chain from the source forward to the target.
    let mut edges = Vec::with_capacity(weight.length as usize);
    let mut node = *source;
    while node != *target {
        match predecessor.get(&node) {
            Some(edge) => {
                node = edge.desc.to;
                edges.push(edge.clone());
            }
            None => return Ok(None),
        }
    }

    tracing::trace!(
        settled = settled.len(),
        length = weight.length,
        cost = %weight.cost,
        "backward search reached source"
    );
    Ok(Some(WeightedPath { edges, weight }))
}
