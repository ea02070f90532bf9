/// Errors produced when parsing or constructing core primitives.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("invalid short channel id: {0}")]
    InvalidShortChannelId(String),
}
