use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Value in millisatoshi, the smallest unit carried over a payment channel.
///
/// All arithmetic is checked; callers treat `None` as "this edge cannot be
/// used", never as a panic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from millisatoshi.
    pub const fn from_msat(msat: u64) -> Self {
        Self(msat)
    }

    /// Create an amount from whole satoshi.
    pub fn from_sat(sat: u64) -> Self {
        Self(sat.saturating_mul(1_000))
    }

    /// The raw millisatoshi value.
    pub const fn msat(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// `self * millionths / 1_000_000`, truncating toward zero.
    ///
    /// This is the proportional-fee building block: relay fees are quoted
    /// in parts per million of the forwarded amount. The multiplication is
    /// widened to 128 bits; `None` only when the final value does not fit
    /// back into 64 bits.
    pub fn checked_millionths(self, millionths: u64) -> Option<Amount> {
        let scaled = (self.0 as u128) * (millionths as u128) / 1_000_000;
        u64::try_from(scaled).ok().map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} msat", self.0)
    }
}

/// Absolute block height of the chain.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHeight(pub u32);

impl BlockHeight {
    /// Blocks elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn blocks_since(self, earlier: BlockHeight) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-hop contribution to a payment's timelock budget, in blocks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CltvExpiryDelta(pub u16);

impl CltvExpiryDelta {
    pub const fn to_u32(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for CltvExpiryDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A channel identifier: the coordinates of the funding output packed as
/// `block_height << 40 | tx_index << 16 | output_index`.
///
/// The block-height component is what the routing age heuristic reads.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShortChannelId(u64);

impl ShortChannelId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Pack funding coordinates. `tx_index` is truncated to 24 bits and
    /// `block_height` to 24 bits, matching the wire encoding.
    pub const fn from_coordinates(block_height: u32, tx_index: u32, output_index: u16) -> Self {
        Self(
            ((block_height as u64 & 0xff_ffff) << 40)
                | ((tx_index as u64 & 0xff_ffff) << 16)
                | output_index as u64,
        )
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn block_height(self) -> BlockHeight {
        BlockHeight((self.0 >> 40) as u32)
    }

    pub const fn tx_index(self) -> u32 {
        ((self.0 >> 16) & 0xff_ffff) as u32
    }

    pub const fn output_index(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Display for ShortChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block_height().0,
            self.tx_index(),
            self.output_index()
        )
    }
}

impl FromStr for ShortChannelId {
    type Err = CoreError;

    /// Parse the human-readable `<block>x<tx>x<output>` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('x');
        let (block, tx, output) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(b), Some(t), Some(o), None) => (b, t, o),
            _ => return Err(CoreError::InvalidShortChannelId(s.to_string())),
        };
        let block: u32 = block
            .parse()
            .map_err(|_| CoreError::InvalidShortChannelId(s.to_string()))?;
        let tx: u32 = tx
            .parse()
            .map_err(|_| CoreError::InvalidShortChannelId(s.to_string()))?;
        let output: u16 = output
            .parse()
            .map_err(|_| CoreError::InvalidShortChannelId(s.to_string()))?;
        Ok(Self::from_coordinates(block, tx, output))
    }
}

/// An opaque 33-byte node identifier, shaped like a compressed public key.
///
/// Ordering is byte-lexicographic; the routing layer relies on it to
/// disambiguate channel-update direction bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; 33]);

impl NodeId {
    pub const fn new(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let bytes: [u8; 33] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidNodeId(format!("expected 33 bytes, got {}", bytes.len())))?;
        Ok(Self(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidNodeId(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl FromStr for NodeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NodeId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
