//! Discovery response parsing
//!
//! The endpoint answers with one response body per requested service,
//! distinguished by a numeric flag. Convenience fields at the top level
//! mirror the first body; per-flag data stays addressable for requests
//! that asked for several services at once.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::credentials::derive_turn_credential;
use crate::error::{Error, Result};

use super::request::unix_millis;

/// Response flag: media gateway addresses
pub const FLAG_GATEWAY: u64 = 4096;
/// Response flag: cloud proxy
pub const FLAG_CLOUD_PROXY: u64 = 1_048_576;
/// Response flag: cloud proxy v5
pub const FLAG_CLOUD_PROXY_5: u64 = 4_194_304;
/// Response flag: TURN fallback servers
pub const FLAG_TURN_FALLBACK: u64 = 4_194_310;

/// One edge server address with its derived TURN credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeAddress {
    pub ip: String,
    pub port: u16,
    /// TURN username: the decimal uid string
    pub username: String,
    /// TURN credential: hex SHA-256 of the uid string
    pub credential: String,
    /// Access ticket for this edge
    pub ticket: Option<String>,
    /// DTLS fingerprint advertised for this edge
    pub fingerprint: Option<String>,
}

impl EdgeAddress {
    /// Edge hostname: the IP with dots replaced by dashes under the
    /// relay domain, e.g. `10-1-2-3.edge.agora.io`
    pub fn edge_host(&self, relay_domain: &str) -> String {
        format!("{}.{}", self.ip.replace('.', "-"), relay_domain)
    }

    /// WebSocket gateway URL for this edge
    pub fn websocket_url(&self, relay_domain: &str) -> String {
        format!("wss://{}:{}", self.edge_host(relay_domain), self.port)
    }
}

/// An RTCIceServer entry
#[derive(Debug, Clone, Serialize)]
pub struct IceServer {
    pub urls: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Parsed data for one response flag
#[derive(Debug, Clone)]
pub struct FlagResponse {
    pub code: i64,
    pub addresses: Vec<EdgeAddress>,
    pub ticket: String,
    pub uid: u64,
    pub cid: u64,
    pub channel_name: String,
    /// Detail map accumulated across this and earlier bodies
    pub detail: Map<String, Value>,
    pub flag: u64,
}

/// Parsed discovery response
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub code: i64,
    /// Addresses of the first response body
    pub addresses: Vec<EdgeAddress>,
    pub ticket: String,
    pub uid: u64,
    pub cid: u64,
    pub channel_name: String,
    pub server_ts: u64,
    /// The first body's own detail map
    pub detail: Map<String, Value>,
    pub flag: u64,
    pub opid: u64,
    /// All bodies keyed by flag
    pub responses: BTreeMap<u64, FlagResponse>,
}

impl ServiceResponse {
    /// Parse the raw endpoint JSON.
    ///
    /// Any body with a nonzero code fails the whole response; a missing
    /// or empty `response_body` is malformed.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let bodies = raw
            .get("response_body")
            .and_then(Value::as_array)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                Error::MalformedResponse("missing response_body".to_string())
            })?;

        let mut accumulated_detail: Map<String, Value> = raw
            .get("detail")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut responses = BTreeMap::new();
        let mut first: Option<FlagResponse> = None;

        for item in bodies {
            let buffer = item.get("buffer").cloned().unwrap_or(Value::Null);
            let code = buffer.get("code").and_then(Value::as_i64).unwrap_or(-1);
            if code != 0 {
                return Err(Error::Protocol(format!(
                    "edge service returned code {}",
                    code
                )));
            }

            if let Some(extra) = buffer.get("detail").and_then(Value::as_object) {
                for (k, v) in extra {
                    accumulated_detail.insert(k.clone(), v.clone());
                }
            }

            let flag = buffer.get("flag").and_then(Value::as_u64).unwrap_or(0);
            let uid = buffer.get("uid").and_then(Value::as_u64).unwrap_or(0);
            let ticket = buffer
                .get("cert")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            // one fingerprint per edge address, semicolon-delimited
            let fingerprints: Vec<String> = accumulated_detail
                .get("19")
                .and_then(Value::as_str)
                .map(|s| {
                    s.split(';')
                        .map(str::trim)
                        .filter(|fp| !fp.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let turn = derive_turn_credential(uid);
            let addresses: Vec<EdgeAddress> = buffer
                .get("edges_services")
                .and_then(Value::as_array)
                .map(|edges| {
                    edges
                        .iter()
                        .enumerate()
                        .filter_map(|(i, edge)| {
                            Some(EdgeAddress {
                                ip: edge.get("ip")?.as_str()?.to_string(),
                                port: edge.get("port")?.as_u64()? as u16,
                                username: turn.username.clone(),
                                credential: turn.credential.clone(),
                                ticket: Some(ticket.clone()),
                                fingerprint: fingerprints.get(i).cloned(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            debug!(flag, uid, edges = addresses.len(), "parsed discovery body");

            let parsed = FlagResponse {
                code,
                addresses,
                ticket,
                uid,
                cid: buffer.get("cid").and_then(Value::as_u64).unwrap_or(0),
                channel_name: buffer
                    .get("cname")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                detail: accumulated_detail.clone(),
                flag,
            };
            if first.is_none() {
                first = Some(FlagResponse {
                    detail: buffer
                        .get("detail")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default(),
                    ..parsed.clone()
                });
            }
            responses.insert(flag, parsed);
        }

        let first = first.ok_or_else(|| {
            Error::MalformedResponse("no usable buffer in response_body".to_string())
        })?;

        Ok(Self {
            code: first.code,
            addresses: first.addresses,
            ticket: first.ticket,
            uid: first.uid,
            cid: first.cid,
            channel_name: first.channel_name,
            server_ts: raw
                .get("enter_ts")
                .and_then(Value::as_u64)
                .unwrap_or_else(unix_millis),
            detail: first.detail,
            flag: first.flag,
            opid: raw.get("opid").and_then(Value::as_u64).unwrap_or(0),
            responses,
        })
    }

    /// Data for a specific response flag
    pub fn flag_response(&self, flag: u64) -> Option<&FlagResponse> {
        self.responses.get(&flag)
    }

    /// WebSocket gateway addresses (flag 4096)
    pub fn gateway_addresses(&self) -> &[EdgeAddress] {
        self.addresses_for(FLAG_GATEWAY)
    }

    /// TURN server addresses (flag 4194310)
    pub fn turn_addresses(&self) -> &[EdgeAddress] {
        self.addresses_for(FLAG_TURN_FALLBACK)
    }

    fn addresses_for(&self, flag: u64) -> &[EdgeAddress] {
        if let Some(resp) = self.responses.get(&flag) {
            return &resp.addresses;
        }
        if self.flag == flag {
            return &self.addresses;
        }
        &[]
    }

    /// Synthesize RTCIceServer entries from the TURN addresses
    /// (falling back to the primary addresses when no TURN flag was
    /// requested): UDP and TCP relay on 3478, TLS relay on 443 and a
    /// plain STUN entry, all via the dashed edge hostname.
    pub fn ice_servers(&self, relay_domain: &str) -> Vec<IceServer> {
        let mut addresses = self.turn_addresses();
        if addresses.is_empty() {
            addresses = &self.addresses;
        }

        let mut servers = Vec::with_capacity(addresses.len() * 4);
        for addr in addresses {
            let host = addr.edge_host(relay_domain);
            let with_auth = |urls: String| IceServer {
                urls,
                username: Some(addr.username.clone()),
                credential: Some(addr.credential.clone()),
            };
            servers.push(with_auth(format!("turn:{}:3478?transport=udp", host)));
            servers.push(with_auth(format!("turn:{}:3478?transport=tcp", host)));
            servers.push(with_auth(format!("turns:{}:443?transport=tcp", host)));
            servers.push(IceServer {
                urls: format!("stun:{}:3478", host),
                username: None,
                credential: None,
            });
        }
        servers
    }

    /// Access proof object carried in the join message. With a flag,
    /// formats that flag's data; otherwise the primary response.
    pub fn ap_response(&self, flag: Option<u64>) -> Result<Value> {
        let (code, uid, cid, cname, detail, resp_flag, ticket) = match flag {
            Some(flag) => {
                let resp = self.flag_response(flag).ok_or_else(|| {
                    Error::Protocol(format!("no response data for flag {}", flag))
                })?;
                (
                    resp.code,
                    resp.uid,
                    resp.cid,
                    resp.channel_name.clone(),
                    resp.detail.clone(),
                    resp.flag,
                    resp.ticket.clone(),
                )
            }
            None => (
                self.code,
                self.uid,
                self.cid,
                self.channel_name.clone(),
                self.detail.clone(),
                self.flag,
                self.ticket.clone(),
            ),
        };

        Ok(serde_json::json!({
            "code": code,
            "server_ts": self.server_ts,
            "uid": uid,
            "cid": cid,
            "cname": cname,
            "detail": detail,
            "flag": resp_flag,
            "opid": self.opid,
            "cert": ticket,
            "ticket": ticket,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_flag_response() -> Value {
        json!({
            "response_body": [
                {
                    "buffer": {
                        "code": 0,
                        "flag": 4096,
                        "cert": "TICKET_A",
                        "uid": 12345,
                        "cid": 777,
                        "cname": "chan",
                        "detail": {"19": "AA:BB;CC:DD"},
                        "edges_services": [
                            {"ip": "10.0.0.1", "port": 4700},
                            {"ip": "10.0.0.2", "port": 4701}
                        ]
                    }
                },
                {
                    "buffer": {
                        "code": 0,
                        "flag": 4194310,
                        "cert": "TICKET_B",
                        "uid": 12345,
                        "cid": 777,
                        "cname": "chan",
                        "detail": {},
                        "edges_services": [
                            {"ip": "20.0.0.1", "port": 3478}
                        ]
                    }
                }
            ],
            "enter_ts": 1700000000000u64,
            "opid": 42,
            "detail": {}
        })
    }

    #[test]
    fn test_parse_multi_flag_response() {
        let resp = ServiceResponse::from_value(&two_flag_response()).unwrap();
        assert_eq!(resp.flag, 4096);
        assert_eq!(resp.ticket, "TICKET_A");
        assert_eq!(resp.uid, 12345);
        assert_eq!(resp.server_ts, 1700000000000);
        assert_eq!(resp.responses.len(), 2);

        assert_eq!(resp.gateway_addresses().len(), 2);
        assert_eq!(resp.turn_addresses().len(), 1);
        assert_eq!(resp.turn_addresses()[0].ip, "20.0.0.1");
    }

    #[test]
    fn test_addresses_carry_derived_credentials_and_fingerprints() {
        let resp = ServiceResponse::from_value(&two_flag_response()).unwrap();
        let gateways = resp.gateway_addresses();
        assert_eq!(gateways[0].username, "12345");
        assert_eq!(
            gateways[0].credential,
            "5994471abb01112afcc18159f6cc74b4f511b99806da59b3caf5a9c173cacfc5"
        );
        assert_eq!(gateways[0].fingerprint.as_deref(), Some("AA:BB"));
        assert_eq!(gateways[1].fingerprint.as_deref(), Some("CC:DD"));
    }

    #[test]
    fn test_nonzero_code_is_protocol_error() {
        let raw = json!({"response_body": [{"buffer": {"code": 110}}]});
        match ServiceResponse::from_value(&raw) {
            Err(crate::Error::Protocol(msg)) => assert!(msg.contains("110")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let raw = json!({"response_body": []});
        assert!(matches!(
            ServiceResponse::from_value(&raw),
            Err(crate::Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_ice_server_synthesis() {
        let resp = ServiceResponse::from_value(&two_flag_response()).unwrap();
        let servers = resp.ice_servers("edge.agora.io");
        assert_eq!(servers.len(), 4);
        assert_eq!(
            servers[0].urls,
            "turn:20-0-0-1.edge.agora.io:3478?transport=udp"
        );
        assert_eq!(
            servers[1].urls,
            "turn:20-0-0-1.edge.agora.io:3478?transport=tcp"
        );
        assert_eq!(
            servers[2].urls,
            "turns:20-0-0-1.edge.agora.io:443?transport=tcp"
        );
        assert_eq!(servers[3].urls, "stun:20-0-0-1.edge.agora.io:3478");
        assert!(servers[3].username.is_none());
        assert_eq!(servers[0].username.as_deref(), Some("12345"));
    }

    #[test]
    fn test_websocket_url() {
        let addr = EdgeAddress {
            ip: "10.0.0.1".to_string(),
            port: 4700,
            username: String::new(),
            credential: String::new(),
            ticket: None,
            fingerprint: None,
        };
        assert_eq!(
            addr.websocket_url("edge.agora.io"),
            "wss://10-0-0-1.edge.agora.io:4700"
        );
    }

    #[test]
    fn test_ap_response_shape() {
        let resp = ServiceResponse::from_value(&two_flag_response()).unwrap();
        let ap = resp.ap_response(None).unwrap();
        assert_eq!(ap["cert"], "TICKET_A");
        assert_eq!(ap["ticket"], "TICKET_A");
        assert_eq!(ap["flag"], 4096);
        assert_eq!(ap["opid"], 42);

        let ap_turn = resp.ap_response(Some(FLAG_TURN_FALLBACK)).unwrap();
        assert_eq!(ap_turn["cert"], "TICKET_B");
        assert!(resp.ap_response(Some(99)).is_err());
    }
}
