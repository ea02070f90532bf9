use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use fulgur_core::{Amount, CltvExpiryDelta, NodeId, ShortChannelId};

/// A channel policy that has not been refreshed for this long is
/// considered abandoned by its owner and eligible for pruning.
pub const POLICY_STALE_AFTER_DAYS: i64 = 14;

/// Which direction of a channel a policy applies to, under the
/// lexicographic ordering of the two endpoint node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelDirection {
    /// From the lexicographically smaller endpoint toward the larger one.
    Node1ToNode2,
    /// From the lexicographically larger endpoint toward the smaller one.
    Node2ToNode1,
}

impl ChannelDirection {
    /// The direction of an edge going `from -> to`.
    pub fn of(from: &NodeId, to: &NodeId) -> Self {
        if from < to {
            ChannelDirection::Node1ToNode2
        } else {
            ChannelDirection::Node2ToNode1
        }
    }

    /// The wire-level direction bit.
    pub fn flag(self) -> u8 {
        match self {
            ChannelDirection::Node1ToNode2 => 0,
            ChannelDirection::Node2ToNode1 => 1,
        }
    }
}

/// The relay policy one endpoint advertises for one direction of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub short_channel_id: ShortChannelId,
    /// When the owner last refreshed this policy.
    pub timestamp: DateTime<Utc>,
    pub direction: ChannelDirection,
    /// Blocks this hop adds to the payment's timelock budget.
    pub cltv_expiry_delta: CltvExpiryDelta,
    /// Smallest HTLC the owner will relay.
    pub htlc_minimum: Amount,
    /// Largest HTLC the owner will relay, if advertised.
    pub htlc_maximum: Option<Amount>,
    /// Flat fee charged per relayed HTLC.
    pub fee_base: Amount,
    /// Proportional fee in parts per million of the forwarded amount.
    pub fee_proportional_millionths: u64,
}

impl ChannelUpdate {
    /// Fee charged for relaying `amount` across this channel:
    /// `fee_base + amount * ppm / 1_000_000`, truncating toward zero.
    ///
    /// `None` on arithmetic overflow; callers treat that as "edge unusable".
    pub fn fee_for(&self, amount: Amount) -> Option<Amount> {
        let proportional = amount.checked_millionths(self.fee_proportional_millionths)?;
        self.fee_base.checked_add(proportional)
    }

    /// Whether this policy admits an HTLC of `amount`.
    ///
    /// Both bounds are checked independently, so a policy whose
    /// `htlc_maximum` sits below its `htlc_minimum` admits nothing.
    pub fn can_carry(&self, amount: Amount) -> bool {
        amount >= self.htlc_minimum && self.htlc_maximum.map_or(true, |max| amount <= max)
    }

    /// True once the policy is two weeks past its last refresh.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) >= Duration::days(POLICY_STALE_AFTER_DAYS)
    }
}
