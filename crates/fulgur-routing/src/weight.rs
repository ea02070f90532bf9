use serde::{Deserialize, Serialize};

use fulgur_core::{Amount, BlockHeight, NodeId};

use crate::error::RouteError;
use crate::graph::GraphEdge;

/// Largest `cltv_expiry_delta` the timelock penalty normalizes against.
pub const CLTV_MAX: u32 = 2016;

/// Channels older than this many blocks (about two years) carry no age
/// penalty at all.
pub const AGE_MAX_BLOCKS: u32 = 105_120;

/// Capacity at or above which the capacity penalty vanishes.
pub const CAPACITY_MAX: Amount = Amount::from_msat(8_000_000_000);

/// Capacity assumed for policies that advertise no `htlc_maximum`.
/// Deliberately small: a channel that hides its size is scored as if it
/// were a small one.
pub const CAPACITY_FALLBACK: Amount = Amount::from_msat(100_000_000);

/// Smallest admissible increase of the ordering key per relaxed edge.
/// Fees are integral millisatoshi, so a real fee moves the key by at least
/// 1.0 while a full-length path accumulates at most 20 of these epsilons;
/// the epsilon breaks zero-fee plateaus without ever reordering two paths
/// whose costs differ.
pub const MIN_WEIGHT_INCREMENT: f64 = 1e-3;

/// Cumulative state of a partial path during the backward search,
/// accumulated from the target toward the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RichWeight {
    /// Amount that must enter this vertex to deliver the payment to the
    /// target, downstream fees included.
    pub cost: Amount,
    /// Sum of downstream `cltv_expiry_delta`s.
    pub cltv: u32,
    /// Number of hops from this vertex to the target.
    pub length: u32,
    /// The priority key of the search. Strictly increases with every
    /// relaxed edge; used only for ordering.
    pub weight: f64,
}

impl RichWeight {
    /// The accumulator seeded at the target of a search.
    pub fn at_target(amount: Amount) -> Self {
        Self { cost: amount, cltv: 0, length: 0, weight: 0.0 }
    }
}

/// Relative importance of the age, timelock and capacity penalties in the
/// edge weight. Each factor lies in [0, 1] and together they sum to at
/// most 1; all zero (or `None` upstream) degenerates to pure fee cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRatios {
    pub age_factor: f64,
    pub cltv_delta_factor: f64,
    pub capacity_factor: f64,
}

impl WeightRatios {
    pub fn new(
        age_factor: f64,
        cltv_delta_factor: f64,
        capacity_factor: f64,
    ) -> Result<Self, RouteError> {
        let ratios = Self { age_factor, cltv_delta_factor, capacity_factor };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> Result<(), RouteError> {
        let sum = self.age_factor + self.cltv_delta_factor + self.capacity_factor;
        let in_range = |f: f64| (0.0..=1.0).contains(&f);
        if !in_range(self.age_factor)
            || !in_range(self.cltv_delta_factor)
            || !in_range(self.capacity_factor)
            || sum > 1.0
            || !sum.is_finite()
        {
            return Err(RouteError::InvalidWeightRatios { sum });
        }
        Ok(())
    }
}

impl Default for WeightRatios {
    fn default() -> Self {
        Self { age_factor: 0.35, cltv_delta_factor: 0.15, capacity_factor: 0.5 }
    }
}

/// Relax `edge` against the accumulator `prev` sitting at `edge.desc.to`.
///
/// `from_source` must be true when `edge.desc.from` is the source of the
/// whole search: a payer charges itself neither a fee nor a timelock delta
/// on its own outgoing channel.
///
/// Returns `None` when fee or timelock arithmetic overflows, which callers
/// treat as "edge unusable".
pub fn edge_weight(
    edge: &GraphEdge,
    prev: &RichWeight,
    from_source: bool,
    current_block: BlockHeight,
    ratios: Option<&WeightRatios>,
) -> Option<RichWeight> {
    let fee = if from_source {
        Amount::ZERO
    } else {
        edge.update.fee_for(prev.cost)?
    };
    let cost = prev.cost.checked_add(fee)?;
    let cltv = if from_source {
        prev.cltv
    } else {
        prev.cltv.checked_add(edge.update.cltv_expiry_delta.to_u32())?
    };
    let length = prev.length + 1;

    // Keep the key strictly increasing even across free edges, otherwise
    // the search could revisit a zero-fee cycle forever.
    let floor = prev.weight + MIN_WEIGHT_INCREMENT;
    let weight = match ratios {
        None => (cost.msat() as f64).max(floor),
        Some(ratios) => {
            let penalty = hop_penalty(edge, current_block, ratios);
            (prev.weight + penalty * fee.msat() as f64).max(floor)
        }
    };

    Some(RichWeight { cost, cltv, length, weight })
}

/// The multi-factor penalty of one hop, in [1, 2]. Multiplies the hop's
/// fee in the ordering key: all else equal the search prefers older
/// channels, smaller timelock deltas and larger capacities.
fn hop_penalty(edge: &GraphEdge, current_block: BlockHeight, ratios: &WeightRatios) -> f64 {
    let cltv_score =
        (edge.update.cltv_expiry_delta.to_u32() as f64 / CLTV_MAX as f64).min(1.0);

    let channel_block = edge.desc.short_channel_id.block_height();
    let age_blocks = current_block.blocks_since(channel_block);
    let age_score = 1.0 - (age_blocks as f64 / AGE_MAX_BLOCKS as f64).min(1.0);

    let capacity = edge.update.htlc_maximum.unwrap_or(CAPACITY_FALLBACK);
    let capacity_score = 1.0 - (capacity.msat() as f64 / CAPACITY_MAX.msat() as f64).min(1.0);

    1.0 + age_score * ratios.age_factor
        + cltv_score * ratios.cltv_delta_factor
        + capacity_score * ratios.capacity_factor
}

/// Weigh a complete `source -> target` edge sequence by folding it from
/// the target side, exactly the way the search accumulates it. Verifies
/// HTLC feasibility of every edge along the way.
///
/// `None` when arithmetic overflows or some edge cannot carry the amount
/// that would flow across it.
pub fn path_weight(
    source: &NodeId,
    edges: &[GraphEdge],
    amount: Amount,
    current_block: BlockHeight,
    ratios: Option<&WeightRatios>,
) -> Option<RichWeight> {
    edges.iter().rev().try_fold(RichWeight::at_target(amount), |acc, edge| {
        if !edge.update.can_carry(acc.cost) {
            return None;
        }
        edge_weight(edge, &acc, &edge.desc.from == source, current_block, ratios)
    })
}
