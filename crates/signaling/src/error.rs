//! Error types for the signaling client

use thiserror::Error;

/// Result type alias for signaling operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while negotiating a stream
///
/// A degraded answer is deliberately *not* an error: once the join is on
/// the wire, read-loop trouble yields a best-effort SDP with a
/// distinguishable status instead (see [`crate::SdpAnswer`]). Hard
/// failures are confined to the phases before that point: an unparseable
/// offer, discovery exhaustion, a failed gateway handshake or join send,
/// and an explicit relay error.
#[derive(Debug, Error)]
pub enum Error {
    /// Every discovery host (primary and backup) failed or returned a
    /// non-zero code for at least one requested service flag
    #[error("all discovery hosts failed")]
    DiscoveryUnavailable,

    /// The input SDP offer is missing required structure
    #[error("malformed SDP offer: {0}")]
    MalformedOffer(String),

    /// The relay sent an explicit protocol-level error message
    #[error("relay protocol error: {0}")]
    Protocol(String),

    /// A discovery host answered with a body we could not decode
    ///
    /// Per-host this is normally a soft failure (the next host is tried);
    /// `TransportConfig::fail_fast_on_malformed` escalates it instead.
    #[error("malformed service response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Transport error (HTTP, TLS or WebSocket plumbing)
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
