use rand::Rng;
use serde::{Deserialize, Serialize};

use fulgur_core::{Amount, BlockHeight, CltvExpiryDelta, NodeId};

use crate::error::RouteError;
use crate::graph::{DirectedGraph, GraphEdge};
use crate::pathfinder::{CancelToken, Ignored, SearchBounds, WeightContext, WeightedPath};
use crate::policy::ChannelUpdate;
use crate::weight::{RichWeight, WeightRatios};
use crate::yen::yen_k_shortest_paths;

/// Default number of alternative paths a query enumerates before picking.
pub const DEFAULT_ROUTES_COUNT: usize = 3;

/// One directed edge traversal of a finished route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub from: NodeId,
    pub to: NodeId,
    /// The policy in force on this edge when the route was computed.
    pub last_update: ChannelUpdate,
}

/// A complete route for a payment of `amount`, hops ordered payer first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub amount: Amount,
    pub hops: Vec<Hop>,
}

impl Route {
    fn from_path(amount: Amount, path: &WeightedPath) -> Self {
        let hops = path
            .edges
            .iter()
            .map(|edge| Hop {
                from: edge.desc.from,
                to: edge.desc.to,
                last_update: edge.update.clone(),
            })
            .collect();
        Self { amount, hops }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Total fee paid along the route: everything beyond `amount` the
    /// payer must send. The payer's own outgoing channel charges nothing,
    /// so the fold skips the first hop.
    pub fn fee(&self) -> Amount {
        let mut entering = self.amount;
        for hop in self.hops[1..].iter().rev() {
            let fee = hop.last_update.fee_for(entering).unwrap_or(Amount::ZERO);
            entering = entering.checked_add(fee).unwrap_or(entering);
        }
        entering.saturating_sub(self.amount)
    }

    /// The timelock budget this route consumes: the sum of
    /// `cltv_expiry_delta`s of every hop after the first. The payer applies
    /// its own channel's delta locally; it does not count against the
    /// route budget.
    pub fn cltv(&self) -> u32 {
        self.hops
            .iter()
            .skip(1)
            .map(|hop| hop.last_update.cltv_expiry_delta.to_u32())
            .sum()
    }

    /// Check end-to-end shape: non-empty, starts at `source`, ends at
    /// `target`, hops contiguous, no vertex visited twice.
    pub fn validate(&self, source: &NodeId, target: &NodeId) -> Result<(), RouteError> {
        let (first, last) = match (self.hops.first(), self.hops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(RouteError::InvalidRoute { reason: "empty route".into() });
            }
        };
        if &first.from != source {
            return Err(RouteError::InvalidRoute { reason: "route does not start at source".into() });
        }
        if &last.to != target {
            return Err(RouteError::InvalidRoute { reason: "route does not end at target".into() });
        }
        for pair in self.hops.windows(2) {
            if pair[0].to != pair[1].from {
                return Err(RouteError::InvalidRoute { reason: "hops are not contiguous".into() });
            }
        }
        let mut visited: Vec<NodeId> = self.hops.iter().map(|h| h.from).collect();
        visited.push(last.to);
        let mut deduped = visited.clone();
        deduped.sort();
        deduped.dedup();
        if deduped.len() != visited.len() {
            return Err(RouteError::InvalidRoute { reason: "route visits a vertex twice".into() });
        }
        Ok(())
    }
}

/// Per-query search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteParams {
    /// Pick uniformly among the enumerated candidates instead of always
    /// taking the best one.
    pub randomize: bool,
    /// Flat fee ceiling; a route is acceptable when its fee stays under
    /// this cap or under `max_fee_pct` of the payment amount.
    pub max_fee_base: Amount,
    /// Proportional fee ceiling, as a fraction of the payment amount.
    pub max_fee_pct: f64,
    /// Upper bound on the summed timelock deltas.
    pub route_max_cltv: CltvExpiryDelta,
    /// Upper bound on hop count, clamped to the hard cap of 20.
    pub route_max_length: u32,
    /// Multi-factor heuristic; `None` means pure fee cost.
    pub ratios: Option<WeightRatios>,
}

impl RouteParams {
    /// The effective fee ceiling for `amount`: the flat cap or the
    /// proportional cap, whichever is more permissive.
    pub fn max_fee(&self, amount: Amount) -> Amount {
        let proportional = Amount::from_msat((amount.msat() as f64 * self.max_fee_pct) as u64);
        self.max_fee_base.max(proportional)
    }
}

impl Default for RouteParams {
    fn default() -> Self {
        RouterConf::default().route_params()
    }
}

/// The router section of the node configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConf {
    pub randomize_route_selection: bool,
    pub search_max_fee_base_sat: u64,
    pub search_max_fee_pct: f64,
    pub search_max_cltv: u16,
    pub search_max_length: u32,
    /// Heuristic weight ratios; absent means rank by fee alone.
    pub search_heuristics: Option<WeightRatios>,
}

impl Default for RouterConf {
    fn default() -> Self {
        Self {
            randomize_route_selection: true,
            search_max_fee_base_sat: 21,
            search_max_fee_pct: 0.03,
            search_max_cltv: 1008,
            search_max_length: 6,
            search_heuristics: None,
        }
    }
}

impl RouterConf {
    pub fn route_params(&self) -> RouteParams {
        RouteParams {
            randomize: self.randomize_route_selection,
            max_fee_base: Amount::from_sat(self.search_max_fee_base_sat),
            max_fee_pct: self.search_max_fee_pct,
            route_max_cltv: CltvExpiryDelta(self.search_max_cltv),
            route_max_length: self.search_max_length,
            ratios: self.search_heuristics,
        }
    }
}

/// One route query against a graph snapshot.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub source: NodeId,
    pub target: NodeId,
    pub amount: Amount,
    /// How many alternative paths to enumerate before picking one.
    pub num_routes: usize,
    pub ignored: Ignored,
    /// Invoice hints and policy overrides; supersede same-desc graph edges.
    pub extra_edges: Vec<GraphEdge>,
    pub params: RouteParams,
}

impl RouteRequest {
    pub fn new(source: NodeId, target: NodeId, amount: Amount) -> Self {
        Self {
            source,
            target,
            amount,
            num_routes: DEFAULT_ROUTES_COUNT,
            ignored: Ignored::none(),
            extra_edges: Vec::new(),
            params: RouteParams::default(),
        }
    }
}

/// Find a route for the given request over an immutable graph snapshot.
///
/// Enumerates up to `num_routes` candidate paths; picks the best, or draws
/// uniformly among them when `params.randomize` is set (the caller seeds
/// the generator, so runs stay reproducible).
pub fn find_route<R: Rng>(
    graph: &DirectedGraph,
    request: &RouteRequest,
    current_block: BlockHeight,
    cancel: Option<&CancelToken>,
    rng: &mut R,
) -> Result<Route, RouteError> {
    if request.source == request.target {
        return Err(RouteError::CannotRouteToSelf);
    }
    let params = &request.params;
    if let Some(ratios) = &params.ratios {
        ratios.validate()?;
    }

    tracing::debug!(
        source = %request.source,
        target = %request.target,
        amount = %request.amount,
        num_routes = request.num_routes,
        "searching route"
    );

    let max_fee = params.max_fee(request.amount);
    let bounds = SearchBounds::new(params.route_max_length, params.route_max_cltv.to_u32());
    let boundary =
        move |weight: &RichWeight| weight.cost.saturating_sub(request.amount) <= max_fee;
    let ctx = WeightContext { current_block, ratios: params.ratios };

    let paths = yen_k_shortest_paths(
        graph,
        &request.source,
        &request.target,
        request.amount,
        &request.ignored,
        &request.extra_edges,
        request.num_routes.max(1),
        bounds,
        &boundary,
        &ctx,
        cancel,
    )?;
    if paths.is_empty() {
        return Err(RouteError::RouteNotFound);
    }

    let picked = if params.randomize && paths.len() > 1 {
        rng.gen_range(0..paths.len())
    } else {
        0
    };
    let route = Route::from_path(request.amount, &paths[picked]);
    route.validate(&request.source, &request.target)?;

    tracing::info!(
        hops = route.len(),
        fee = %route.fee(),
        cltv = route.cltv(),
        "route found"
    );
    Ok(route)
}
