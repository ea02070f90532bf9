/// Errors that can occur during route calculation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("cannot route to self")]
    CannotRouteToSelf,

    #[error("route not found")]
    RouteNotFound,

    #[error("route computation cancelled")]
    Cancelled,

    #[error("weight ratios must each be in [0, 1] and sum to at most 1, got sum {sum}")]
    InvalidWeightRatios { sum: f64 },

    #[error("invalid route: {reason}")]
    InvalidRoute { reason: String },
}
