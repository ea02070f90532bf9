//! Core primitives shared across the Fulgur payment channel node.
//!
//! This crate defines the numeric and identity types every other layer
//! speaks in:
//! - [`Amount`] — millisatoshi values with checked arithmetic.
//! - [`BlockHeight`] and [`CltvExpiryDelta`] — timelock bookkeeping.
//! - [`ShortChannelId`] — the funding-transaction coordinates of a channel
//!   packed into a `u64`.
//! - [`NodeId`] — an opaque 33-byte node identifier with a total order.

pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{Amount, BlockHeight, CltvExpiryDelta, NodeId, ShortChannelId};
