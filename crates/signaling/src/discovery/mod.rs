//! Edge service discovery
//!
//! Before a session can join a channel it asks the vendor's discovery
//! endpoint for gateway and TURN edge addresses plus an access ticket.
//! The request goes to a fixed host list with ordered failover.

mod client;
mod request;
mod response;

pub use client::EdgeServiceClient;
pub use request::{
    merge_defined, DiscoveryRequest, CHOOSE_SERVER_URI, SERVICE_CLOUD_PROXY,
    SERVICE_CLOUD_PROXY_5, SERVICE_GATEWAY, SERVICE_TURN_FALLBACK, UPDATE_TICKET_URI,
};
pub(crate) use request::unix_millis;
pub use response::{
    EdgeAddress, FlagResponse, IceServer, ServiceResponse, FLAG_CLOUD_PROXY,
    FLAG_CLOUD_PROXY_5, FLAG_GATEWAY, FLAG_TURN_FALLBACK,
};
