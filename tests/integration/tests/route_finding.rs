//! End-to-end route-finding scenarios across the graph, search and route
//! assembly layers.

use rand::rngs::StdRng;
use rand::SeedableRng;

use fulgur_core::{Amount, BlockHeight, CltvExpiryDelta, ShortChannelId};
use fulgur_integration_tests::{chain, edge, graph_of, node};
use fulgur_routing::{
    find_route, yen_k_shortest_paths, CancelToken, Ignored, Route, RouteError, RouteParams,
    RouteRequest, SearchBounds, WeightContext, MAX_ROUTE_LENGTH,
};

const BLOCK: BlockHeight = BlockHeight(500_000);

fn deterministic_params() -> RouteParams {
    RouteParams {
        randomize: false,
        route_max_length: MAX_ROUTE_LENGTH,
        route_max_cltv: CltvExpiryDelta(2016),
        ..RouteParams::default()
    }
}

fn request(source: u8, target: u8, amount: u64) -> RouteRequest {
    let mut request = RouteRequest::new(node(source), node(target), Amount::from_msat(amount));
    request.params = deterministic_params();
    request
}

fn route_channel_ids(route: &Route) -> Vec<u64> {
    route
        .hops
        .iter()
        .map(|h| h.last_update.short_channel_id.raw())
        .collect()
}

// =========================================================================
// Basic shortest-path behaviour
// =========================================================================

#[test]
fn test_linear_route() {
    // a -> b -> c -> d -> e, one channel per hop, identical policies.
    let (graph, ..) = chain(4, 1, 10, 9);
    let mut rng = StdRng::seed_from_u64(0);

    let route = find_route(&graph, &request(1, 5, 10_000_000), BLOCK, None, &mut rng)
        .expect("route found");

    assert_eq!(route_channel_ids(&route), vec![1, 2, 3, 4]);
    // Three fee-paying hops at 1 + 10_000_000 * 10 / 1_000_000 = 101 each;
    // the payer's own channel is free.
    assert_eq!(route.fee(), Amount::from_msat(303));
    assert_eq!(route.cltv(), 27);
}

#[test]
fn test_directionality_is_respected() {
    let (graph, ..) = chain(4, 1, 10, 9);
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(
        find_route(&graph, &request(5, 1, 10_000_000), BLOCK, None, &mut rng),
        Err(RouteError::RouteNotFound)
    );
}

/// The payer's own channel charges no fee, so an expensive direct channel
/// beats a chain of cheap intermediaries.
///
/// ```text
///   a --> b --> c --> d --> e
///    \______________/
///     (high base fee)
/// ```
#[test]
fn test_direct_channel_pays_no_fee() {
    let graph = graph_of(vec![
        edge(1, node(1), node(2), 10, 0, 9),
        edge(2, node(2), node(3), 10, 0, 9),
        edge(3, node(3), node(4), 10, 0, 9),
        edge(4, node(1), node(4), 800_000, 0, 9),
        edge(5, node(4), node(5), 10, 0, 9),
    ]);
    let mut rng = StdRng::seed_from_u64(0);

    let route = find_route(&graph, &request(1, 5, 1_000_000), BLOCK, None, &mut rng)
        .expect("route found");

    assert_eq!(route_channel_ids(&route), vec![4, 5]);
    // Only d -> e charges; the direct channel's 800 sat base fee never
    // applies to its owner.
    assert_eq!(route.fee(), Amount::from_msat(10));
}

#[test]
fn test_cheaper_parallel_edge_is_chosen() {
    // f -> g, then two parallel g -> h channels.
    let graph = graph_of(vec![
        edge(1, node(6), node(7), 0, 0, 9),
        edge(2, node(7), node(8), 5, 5, 9),
        edge(3, node(7), node(8), 0, 0, 9),
    ]);
    let mut rng = StdRng::seed_from_u64(0);

    let route = find_route(&graph, &request(6, 8, 10_000_000), BLOCK, None, &mut rng)
        .expect("route found");

    assert_eq!(route_channel_ids(&route), vec![1, 3]);
    assert_eq!(route.fee(), Amount::ZERO);
}

// =========================================================================
// Length, CLTV and feasibility caps
// =========================================================================

#[test]
fn test_length_cap_at_twenty_hops() {
    // 22 nodes, 21 edges: one hop over the hard cap.
    let (graph, source, target) = chain(21, 1, 10, 9);
    let mut rng = StdRng::seed_from_u64(0);

    let mut over = RouteRequest::new(source, target, Amount::from_msat(10_000_000));
    over.params = deterministic_params();
    assert_eq!(
        find_route(&graph, &over, BLOCK, None, &mut rng),
        Err(RouteError::RouteNotFound)
    );

    // One node closer: exactly twenty hops, and the route comes back.
    let mut exact = RouteRequest::new(source, node(21), Amount::from_msat(10_000_000));
    exact.params = deterministic_params();
    let route = find_route(&graph, &exact, BLOCK, None, &mut rng).expect("route found");
    assert_eq!(route.len(), 20);
    assert_eq!(route_channel_ids(&route), (1..=20).collect::<Vec<u64>>());
}

#[test]
fn test_requested_length_above_cap_is_clamped() {
    let (graph, source, target) = chain(21, 1, 10, 9);
    let mut rng = StdRng::seed_from_u64(0);

    let mut request = RouteRequest::new(source, target, Amount::from_msat(10_000_000));
    request.params = RouteParams { route_max_length: 50, ..deterministic_params() };
    assert_eq!(
        find_route(&graph, &request, BLOCK, None, &mut rng),
        Err(RouteError::RouteNotFound)
    );
}

#[test]
fn test_cltv_cap() {
    let (graph, source, target) = chain(4, 1, 0, 144);
    let mut rng = StdRng::seed_from_u64(0);

    // Three non-source hops contribute 432 blocks.
    let mut tight = RouteRequest::new(source, target, Amount::from_msat(1_000));
    tight.params = RouteParams {
        route_max_cltv: CltvExpiryDelta(431),
        ..deterministic_params()
    };
    assert_eq!(
        find_route(&graph, &tight, BLOCK, None, &mut rng),
        Err(RouteError::RouteNotFound)
    );

    let mut loose = RouteRequest::new(source, target, Amount::from_msat(1_000));
    loose.params = RouteParams {
        route_max_cltv: CltvExpiryDelta(432),
        ..deterministic_params()
    };
    let route = find_route(&graph, &loose, BLOCK, None, &mut rng).expect("route found");
    assert_eq!(route.cltv(), 432);
}

#[test]
fn test_htlc_feasibility_boundary() {
    let amount = 10_000u64;

    // htlc_maximum exactly amount + 50: accepted.
    let mut roomy = edge(1, node(1), node(2), 0, 0, 9);
    roomy.update.htlc_maximum = Some(Amount::from_msat(amount + 50));
    let graph = graph_of(vec![roomy]);
    let mut rng = StdRng::seed_from_u64(0);
    let route = find_route(&graph, &request(1, 2, amount), BLOCK, None, &mut rng)
        .expect("route found");
    assert_eq!(route.len(), 1);

    // htlc_minimum above the amount: the only edge is infeasible.
    let mut floored = edge(1, node(1), node(2), 0, 0, 9);
    floored.update.htlc_minimum = Amount::from_msat(amount + 50);
    let graph = graph_of(vec![floored]);
    assert_eq!(
        find_route(&graph, &request(1, 2, amount), BLOCK, None, &mut rng),
        Err(RouteError::RouteNotFound)
    );
}

#[test]
fn test_every_hop_carries_within_bounds() {
    // Policies with real bounds; verify the amount crossing each returned
    // hop fits them.
    let mut edges = vec![
        edge(1, node(1), node(2), 100, 1_000, 9),
        edge(2, node(2), node(3), 200, 2_000, 9),
        edge(3, node(3), node(4), 300, 3_000, 9),
    ];
    for e in &mut edges {
        e.update.htlc_minimum = Amount::from_msat(1_000);
        e.update.htlc_maximum = Some(Amount::from_msat(200_000_000));
    }
    let graph = graph_of(edges);
    let mut rng = StdRng::seed_from_u64(0);

    let amount = 100_000_000u64;
    let route = find_route(&graph, &request(1, 4, amount), BLOCK, None, &mut rng)
        .expect("route found");

    // Recompute the amount entering each hop from the target backward.
    let mut entering = Amount::from_msat(amount);
    for hop in route.hops.iter().skip(1).rev() {
        assert!(hop.last_update.can_carry(entering));
        let fee = hop.last_update.fee_for(entering).expect("no overflow");
        entering = entering.checked_add(fee).expect("no overflow");
    }
    assert!(route.hops[0].last_update.can_carry(entering));
}

// =========================================================================
// K-shortest paths
// =========================================================================

/// The classic spur topology: D -> A -> E, D -> E, E -> F and the long way
/// around through B and C. Exactly four loopless paths exist.
#[test]
fn test_yen_enumerates_four_paths_in_order() {
    let (d, a, e, b, c, f) = (node(4), node(1), node(5), node(2), node(3), node(6));
    let graph = graph_of(vec![
        edge(1, d, a, 100, 0, 9),
        edge(2, d, e, 100, 0, 9),
        edge(3, a, e, 100, 0, 9),
        edge(4, e, f, 100, 0, 9),
        edge(5, e, b, 100, 0, 9),
        edge(6, b, c, 100, 0, 9),
        edge(7, c, f, 100, 0, 9),
    ]);

    let paths = yen_k_shortest_paths(
        &graph,
        &d,
        &f,
        Amount::from_msat(1_000_000),
        &Ignored::none(),
        &[],
        4,
        SearchBounds::new(MAX_ROUTE_LENGTH, 2016),
        &|_| true,
        &WeightContext { current_block: BLOCK, ratios: None },
        None,
    )
    .expect("enumeration ok");

    let ids: Vec<Vec<u64>> = paths
        .iter()
        .map(|p| p.channel_ids().map(ShortChannelId::raw).collect())
        .collect();
    assert_eq!(
        ids,
        vec![
            vec![2, 4],          // D -> E -> F
            vec![1, 3, 4],       // D -> A -> E -> F
            vec![2, 5, 6, 7],    // D -> E -> B -> C -> F
            vec![1, 3, 5, 6, 7], // D -> A -> E -> B -> C -> F
        ]
    );
    for pair in paths.windows(2) {
        assert!(pair[0].weight.weight <= pair[1].weight.weight);
    }
}

// =========================================================================
// Hints, blacklists, cancellation
// =========================================================================

#[test]
fn test_extra_edge_policy_overrides_graph() {
    let (a, b, c) = (node(1), node(2), node(3));
    let public = edge(2, b, c, 10, 0, 9);
    let graph = graph_of(vec![edge(1, a, b, 0, 0, 9), public.clone()]);

    let mut hint = public.clone();
    hint.update.fee_base = Amount::from_msat(333);

    let mut req = request(1, 3, 1_000_000);
    req.extra_edges = vec![hint.clone()];
    let mut rng = StdRng::seed_from_u64(0);

    let route = find_route(&graph, &req, BLOCK, None, &mut rng).expect("route found");
    // The chosen hop reports the hint's policy, not the public one.
    assert_eq!(route.hops[1].last_update, hint.update);
    assert_eq!(route.fee(), Amount::from_msat(333));
}

#[test]
fn test_cancellation_returns_no_partial_route() {
    let (graph, source, target) = chain(10, 1, 10, 9);
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut rng = StdRng::seed_from_u64(0);

    let mut req = RouteRequest::new(source, target, Amount::from_msat(1_000));
    req.params = deterministic_params();
    assert_eq!(
        find_route(&graph, &req, BLOCK, Some(&cancel), &mut rng),
        Err(RouteError::Cancelled)
    );
}

#[test]
fn test_graph_is_untouched_by_search() {
    let (graph, source, target) = chain(6, 1, 10, 9);
    let before = graph.clone();
    let mut rng = StdRng::seed_from_u64(0);

    let mut req = RouteRequest::new(source, target, Amount::from_msat(10_000_000));
    req.params = deterministic_params();
    find_route(&graph, &req, BLOCK, None, &mut rng).expect("route found");

    assert_eq!(graph, before);
}

#[test]
fn test_fee_excludes_source_hop() {
    // a -> b -> c where the first channel quotes an outrageous fee; the
    // total fee must only reflect b -> c.
    let graph = graph_of(vec![
        edge(1, node(1), node(2), 1_000_000, 100_000, 9),
        edge(2, node(2), node(3), 25, 0, 9),
    ]);
    let mut rng = StdRng::seed_from_u64(0);

    let route = find_route(&graph, &request(1, 3, 5_000_000), BLOCK, None, &mut rng)
        .expect("route found");
    assert_eq!(route.fee(), Amount::from_msat(25));
}
