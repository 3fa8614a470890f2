//! Agora-compatible WebRTC signaling client
//!
//! Implements the signaling half of a WebRTC stream against Agora's
//! production infrastructure without the vendor SDK: edge discovery over
//! HTTP, capability negotiation from a browser offer, the `join_v3`
//! WebSocket handshake and SDP answer synthesis.
//!
//! The crate's central promise is that a join put on the wire always
//! produces an answer: when the gateway misbehaves after accepting the
//! join request, the session degrades to a locally generated fallback
//! SDP instead of failing the stream. Failures before that point (bad
//! offer, discovery exhaustion, failed handshake) surface as errors.
//!
//! # Flow
//!
//! 1. [`EdgeServiceClient::choose_server`] asks the discovery endpoint
//!    for gateway and TURN edges (with ordered multi-host failover).
//! 2. The browser's offer is parsed ([`sdp`]) and mapped to ORTC
//!    capabilities ([`negotiate`]).
//! 3. [`SignalingSession::connect_and_join`] opens a WebSocket to the
//!    first gateway edge, sends `join_v3` and drives the read loop.
//! 4. The gateway's reply (direct answer or negotiated ORTC parameters)
//!    becomes the answer SDP ([`answer`]).
//!
//! ```no_run
//! use agora_signaling::{RelayCredentials, SignalingSession, TransportConfig};
//!
//! # async fn run(offer_sdp: &str) -> agora_signaling::Result<()> {
//! let credentials = RelayCredentials {
//!     app_id: "app".into(),
//!     token: "token".into(),
//!     channel_name: "channel".into(),
//!     uid: 81260392,
//!     string_uid: None,
//! };
//! let mut session = SignalingSession::new(TransportConfig::default());
//! let answer = session.connect_and_join(&credentials, offer_sdp).await?;
//! println!("answer ({} bytes)", answer.sdp().len());
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod negotiate;
pub mod ortc;
pub mod sdp;
pub mod signaling;

pub use config::TransportConfig;
pub use credentials::{derive_turn_credential, RelayCredentials, TurnCredential};
pub use discovery::{EdgeAddress, EdgeServiceClient, IceServer, ServiceResponse};
pub use error::{Error, Result};
pub use ortc::OrtcParameters;
pub use signaling::{SdpAnswer, SessionState, SignalingSession};

/// Crate version string
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::version().is_empty());
    }
}
