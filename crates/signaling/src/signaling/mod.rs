//! Gateway WebSocket signaling
//!
//! One WebSocket per session: connect to a gateway edge, send a single
//! `join_v3` request, then drive a read loop until an answer can be
//! produced one way or another.

mod messages;
mod session;

pub use messages::{Inbound, InboundMessage, JoinRequest};
pub use session::{CancelHandle, SdpAnswer, SessionState, SignalingSession};
