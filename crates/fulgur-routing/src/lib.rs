//! Route calculation for the Fulgur payment channel node.
//!
//! This crate is a pure, synchronous library: given an immutable snapshot
//! of the channel graph and a query, it computes a fee-minimizing route
//! (or a typed failure) without performing any I/O. It provides:
//! - [`DirectedGraph`] — a directed multigraph of channels keyed by
//!   (channel id, direction), with the incoming adjacency the backward
//!   search needs.
//! - [`ChannelUpdate`] — per-direction relay policies with fee and HTLC
//!   feasibility helpers.
//! - [`shortest_path`] — a modified Dijkstra that runs backward from the
//!   payment target, so every fee is computed on the exact amount crossing
//!   the channel.
//! - [`yen_k_shortest_paths`] — deterministic loopless K-shortest-paths
//!   enumeration built on the backward search.
//! - [`find_route`] — the query entry point, with per-search blacklists,
//!   invoice hints, fee/timelock/length ceilings and optional randomized
//!   selection.

pub mod error;
pub mod graph;
pub mod hints;
pub mod pathfinder;
pub mod policy;
pub mod route;
pub mod weight;
pub mod yen;

pub use error::RouteError;
pub use graph::{ChannelDesc, DirectedGraph, GraphEdge, PublicChannel};
pub use hints::{assisted_channels_from_hints, ignored_channel_descs, AssistedChannel, ExtraHop};
pub use pathfinder::{
    shortest_path, CancelToken, Ignored, SearchBounds, WeightContext, WeightedPath,
    MAX_ROUTE_LENGTH,
};
pub use policy::{ChannelDirection, ChannelUpdate};
pub use route::{find_route, Hop, Route, RouteParams, RouteRequest, RouterConf};
pub use weight::{path_weight, RichWeight, WeightRatios};
pub use yen::yen_k_shortest_paths;
