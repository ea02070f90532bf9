use std::cmp::Ordering;
use std::collections::HashSet;

use fulgur_core::{Amount, NodeId};

use crate::error::RouteError;
use crate::graph::{ChannelDesc, DirectedGraph, GraphEdge};
use crate::pathfinder::{shortest_path, CancelToken, Ignored, SearchBounds, WeightContext, WeightedPath};
use crate::weight::{path_weight, RichWeight};

/// Yen's K-shortest loopless paths over the backward Dijkstra.
///
/// Paths come back in non-decreasing weight order, ties broken by length
/// and then by channel-id sequence, so enumeration is reproducible. Fewer
/// than `k` paths are returned when the graph runs dry under the given
/// constraints.
#[allow(clippy::too_many_arguments)]
pub fn yen_k_shortest_paths(
    graph: &DirectedGraph,
    source: &NodeId,
    target: &NodeId,
    amount: Amount,
    ignored: &Ignored,
    extra_edges: &[GraphEdge],
    k: usize,
    bounds: SearchBounds,
    boundary: &dyn Fn(&RichWeight) -> bool,
    ctx: &WeightContext,
    cancel: Option<&CancelToken>,
) -> Result<Vec<WeightedPath>, RouteError> {
    if k == 0 {
        return Ok(Vec::new());
    }

    let Some(shortest) = shortest_path(
        graph, source, target, amount, ignored, extra_edges, bounds, boundary, ctx, cancel,
    )?
    else {
        return Ok(Vec::new());
    };

    let mut seen: HashSet<Vec<ChannelDesc>> = HashSet::new();
    seen.insert(desc_sequence(&shortest));
    let mut found: Vec<WeightedPath> = vec![shortest];
    // Spur paths not yet promoted, kept sorted lightest-first.
    let mut candidates: Vec<WeightedPath> = Vec::new();

    for _ in 1..k {
        let previous = found[found.len() - 1].clone();

        for spur_index in 0..previous.edges.len() {
            let root = &previous.edges[..spur_index];
            let spur_node = previous.edges[spur_index].desc.from;

            // Force divergence at the spur: ban the edge every already
            // found path with this root takes next, and ban the root's
            // interior nodes so the spur cannot loop back through them.
            let mut spur_ignored = ignored.clone();
            for path in &found {
                if path.edges.len() > spur_index && descs_match(&path.edges[..spur_index], root) {
                    spur_ignored.edges.insert(path.edges[spur_index].desc);
                }
            }
            for edge in root {
                spur_ignored.vertices.insert(edge.desc.from);
            }

            let spur = shortest_path(
                graph,
                &spur_node,
                target,
                amount,
                &spur_ignored,
                extra_edges,
                bounds,
                boundary,
                ctx,
                cancel,
            )?;
            let Some(spur) = spur else { continue };

            let mut edges = root.to_vec();
            edges.extend(spur.edges);

            let key: Vec<ChannelDesc> = edges.iter().map(|e| e.desc).collect();
            if seen.contains(&key) {
                continue;
            }

            // Re-weigh the concatenation from the true source: the root's
            // fees depend on what the new spur costs downstream.
            let Some(weight) = path_weight(source, &edges, amount, ctx.current_block, ctx.ratios.as_ref())
            else {
                continue;
            };
            if !bounds.admits(&weight) || !boundary(&weight) {
                continue;
            }

            seen.insert(key);
            candidates.push(WeightedPath { edges, weight });
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(compare_paths);
        found.push(candidates.remove(0));
    }

    tracing::debug!(requested = k, found = found.len(), "k-shortest enumeration done");
    Ok(found)
}

fn desc_sequence(path: &WeightedPath) -> Vec<ChannelDesc> {
    path.edges.iter().map(|e| e.desc).collect()
}

fn descs_match(a: &[GraphEdge], b: &[GraphEdge]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.desc == y.desc)
}

/// Order candidate paths by weight, then length, then by their channel-id
/// sequence.
fn compare_paths(a: &WeightedPath, b: &WeightedPath) -> Ordering {
    a.weight
        .weight
        .total_cmp(&b.weight.weight)
        .then_with(|| a.weight.length.cmp(&b.weight.length))
        .then_with(|| a.channel_ids().cmp(b.channel_ids()))
}
