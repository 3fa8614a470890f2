//! Discovery request payloads

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::credentials::RelayCredentials;

use super::response::EdgeAddress;

/// Operation URI for the initial server-selection request
pub const CHOOSE_SERVER_URI: u32 = 22;
/// Operation URI for the ticket-refresh request
pub const UPDATE_TICKET_URI: u32 = 28;

/// Service id: media gateway (WebSocket edges)
pub const SERVICE_GATEWAY: u32 = 11;
/// Service id: cloud proxy
pub const SERVICE_CLOUD_PROXY: u32 = 18;
/// Service id: cloud proxy v5
pub const SERVICE_CLOUD_PROXY_5: u32 = 20;
/// Service id: TURN fallback servers
pub const SERVICE_TURN_FALLBACK: u32 = 26;

/// Merge ordered key/value pairs into a JSON object, skipping undefined
/// values. Later occurrences of a key overwrite earlier ones.
pub fn merge_defined(pairs: &[(&str, Option<String>)]) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in pairs {
        if let Some(value) = value {
            out.insert((*key).to_string(), Value::String(value.clone()));
        }
    }
    out
}

/// Top-level discovery request envelope
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryRequest {
    pub appid: String,
    pub client_ts: u64,
    pub opid: u64,
    pub sid: String,
    pub request_bodies: Vec<RequestBody>,
}

/// One operation inside the envelope
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub uri: u32,
    pub buffer: RequestBuffer,
}

/// The operation payload
#[derive(Debug, Clone, Serialize)]
pub struct RequestBuffer {
    pub cname: String,
    pub detail: Map<String, Value>,
    pub key: String,
    pub service_ids: Vec<u32>,
    pub uid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges_services: Option<Vec<EdgeEcho>>,
}

/// An edge address echoed back in a ticket-refresh request
#[derive(Debug, Clone, Serialize)]
pub struct EdgeEcho {
    pub ip: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
}

impl From<&EdgeAddress> for EdgeEcho {
    fn from(addr: &EdgeAddress) -> Self {
        Self {
            ip: addr.ip.clone(),
            port: addr.port,
            ticket: addr.ticket.clone(),
        }
    }
}

impl DiscoveryRequest {
    /// Build a server-selection request (URI 22).
    pub fn choose_server(
        credentials: &RelayCredentials,
        role: u32,
        area_code: &str,
        service_flags: &[u32],
        sid: &str,
    ) -> Self {
        Self::build(
            credentials,
            CHOOSE_SERVER_URI,
            Some(role),
            area_code,
            service_flags,
            sid,
            None,
        )
    }

    /// Build a ticket-refresh request (URI 28), echoing the edge
    /// addresses from the previous response.
    pub fn update_ticket(
        credentials: &RelayCredentials,
        area_code: &str,
        service_flags: &[u32],
        sid: &str,
        edges: &[EdgeAddress],
    ) -> Self {
        Self::build(
            credentials,
            UPDATE_TICKET_URI,
            None,
            area_code,
            service_flags,
            sid,
            Some(edges.iter().map(EdgeEcho::from).collect()),
        )
    }

    fn build(
        credentials: &RelayCredentials,
        uri: u32,
        role: Option<u32>,
        area_code: &str,
        service_flags: &[u32],
        sid: &str,
        edges_services: Option<Vec<EdgeEcho>>,
    ) -> Self {
        let detail = merge_defined(&[
            ("11", Some(area_code.to_string())),
            ("17", role.map(|r| r.to_string())),
            ("22", Some(area_code.to_string())),
        ]);

        Self {
            appid: credentials.app_id.clone(),
            client_ts: unix_millis(),
            opid: rand::thread_rng().gen_range(0..1_000_000_000_000u64),
            sid: sid.to_string(),
            request_bodies: vec![RequestBody {
                uri,
                buffer: RequestBuffer {
                    cname: credentials.channel_name.clone(),
                    detail,
                    key: credentials.token.clone(),
                    service_ids: service_flags.to_vec(),
                    uid: credentials.uid,
                    edges_services,
                },
            }],
        }
    }
}

/// Random session id in the range the vendor SDK uses
pub(crate) fn random_sid() -> String {
    rand::thread_rng().gen_range(0..i32::MAX as u64).to_string()
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> RelayCredentials {
        RelayCredentials {
            app_id: "app123".to_string(),
            token: "tok456".to_string(),
            channel_name: "chan".to_string(),
            uid: 81260392,
            string_uid: None,
        }
    }

    #[test]
    fn test_merge_defined_skips_none_and_overwrites() {
        let merged = merge_defined(&[
            ("11", Some("CN".to_string())),
            ("17", None),
            ("22", Some("CN".to_string())),
            ("11", Some("GLOBAL".to_string())),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["11"], "GLOBAL");
        assert_eq!(merged["22"], "CN");
        assert!(!merged.contains_key("17"));
    }

    #[test]
    fn test_choose_server_payload_shape() {
        let req = DiscoveryRequest::choose_server(&credentials(), 1, "CN,GLOBAL", &[11, 26], "77");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["appid"], "app123");
        assert_eq!(v["sid"], "77");
        assert_eq!(v["request_bodies"][0]["uri"], 22);
        let buffer = &v["request_bodies"][0]["buffer"];
        assert_eq!(buffer["cname"], "chan");
        assert_eq!(buffer["key"], "tok456");
        assert_eq!(buffer["uid"], 81260392);
        assert_eq!(buffer["service_ids"], serde_json::json!([11, 26]));
        assert_eq!(buffer["detail"]["11"], "CN,GLOBAL");
        assert_eq!(buffer["detail"]["17"], "1");
        assert_eq!(buffer["detail"]["22"], "CN,GLOBAL");
        assert!(buffer.get("edges_services").is_none());
    }

    #[test]
    fn test_update_ticket_echoes_edges() {
        let edges = vec![EdgeAddress {
            ip: "10.0.0.1".to_string(),
            port: 4700,
            username: "81260392".to_string(),
            credential: "deadbeef".to_string(),
            ticket: Some("cert".to_string()),
            fingerprint: None,
        }];
        let req = DiscoveryRequest::update_ticket(&credentials(), "CN,GLOBAL", &[11], "1", &edges);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["request_bodies"][0]["uri"], 28);
        let echoed = &v["request_bodies"][0]["buffer"]["edges_services"][0];
        assert_eq!(echoed["ip"], "10.0.0.1");
        assert_eq!(echoed["port"], 4700);
        assert_eq!(echoed["ticket"], "cert");
        // role is absent in ticket refresh
        assert!(v["request_bodies"][0]["buffer"]["detail"].get("17").is_none());
    }
}
