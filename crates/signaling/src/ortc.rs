//! ORTC parameter shapes used on the relay wire
//!
//! The relay exchanges negotiation data as ORTC-style JSON rather than SDP:
//! the join message carries the local capabilities in this shape and the
//! join-success message returns the negotiated remote parameters in it.
//! Field names follow the vendor wire exactly (camelCase, `entry` /
//! `extensionName` for extensions, `fmtp.parameters` as an object whose
//! values may be null).

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// ICE parameters (local in the join message, remote in join-success)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceParameters {
    /// ICE username fragment
    #[serde(default)]
    pub ice_ufrag: String,

    /// ICE password
    #[serde(default)]
    pub ice_pwd: String,

    /// Explicit candidate list; only present when the relay pushes its
    /// candidates through signaling instead of trickling them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<IceCandidateInfo>,
}

/// One ICE candidate carried inside [`IceParameters`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInfo {
    /// Candidate foundation
    #[serde(default)]
    pub foundation: String,
    /// Component id (1 = RTP)
    #[serde(default = "default_component")]
    pub component: u32,
    /// Transport protocol ("udp" / "tcp")
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Candidate priority
    #[serde(default)]
    pub priority: u64,
    /// Candidate address
    #[serde(default)]
    pub ip: String,
    /// Candidate port
    #[serde(default)]
    pub port: u16,
    /// Candidate type ("host", "srflx", "relay", ...)
    #[serde(rename = "type", default = "default_candidate_type")]
    pub kind: String,
}

fn default_component() -> u32 {
    1
}

fn default_protocol() -> String {
    "udp".to_string()
}

fn default_candidate_type() -> String {
    "host".to_string()
}

/// DTLS parameters: role plus one or more certificate fingerprints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DtlsParameters {
    /// Remote DTLS role ("server" / "client" / "auto"); absent locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Certificate fingerprints, in advertised order
    #[serde(default)]
    pub fingerprints: Vec<DtlsFingerprint>,
}

/// A DTLS certificate fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtlsFingerprint {
    /// Hash function name, e.g. "sha-256". Some relay builds call this
    /// field `algorithm`.
    #[serde(alias = "algorithm", default = "default_hash_function")]
    pub hash_function: String,

    /// Colon-separated hex digest
    #[serde(default)]
    pub fingerprint: String,
}

fn default_hash_function() -> String {
    "sha-256".to_string()
}

/// An RTP codec capability as the relay models it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecCapability {
    /// RTP payload type (0-127)
    pub payload_type: u8,

    /// rtpmap parameters
    pub rtp_map: RtpMap,

    /// RTCP feedback entries
    #[serde(default)]
    pub rtcp_feedbacks: Vec<RtcpFeedback>,

    /// fmtp parameters
    #[serde(default, skip_serializing_if = "Fmtp::is_empty")]
    pub fmtp: Fmtp,
}

/// The rtpmap half of a codec capability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpMap {
    /// Encoding name, e.g. "opus" or "VP8" (case preserved)
    pub encoding_name: String,

    /// Clock rate in Hz
    pub clock_rate: u32,

    /// Optional encoding parameter (channel count for audio)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_parameters: Option<u32>,
}

/// One RTCP feedback entry ("nack", "ccm fir", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcpFeedback {
    /// Feedback type
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional feedback parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl RtcpFeedback {
    /// Parameter-less feedback entry
    pub fn plain(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            parameter: None,
        }
    }

    /// Feedback entry with a parameter
    pub fn with_parameter(kind: &str, parameter: &str) -> Self {
        Self {
            kind: kind.to_string(),
            parameter: Some(parameter.to_string()),
        }
    }
}

/// fmtp wrapper matching the wire shape `{"fmtp": {"parameters": {...}}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fmtp {
    /// Parameter map, insertion-ordered
    #[serde(default)]
    pub parameters: FmtpParameters,
}

impl Fmtp {
    /// True when no parameters are present
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Ordered fmtp parameter map.
///
/// Serialized as a JSON object; values may be null for bare keys such as
/// the red codec's `111/111` marker. Kept as a vector of pairs because the
/// SDP round-trip law requires parameter order to survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FmtpParameters(pub Vec<(String, Option<String>)>);

impl FmtpParameters {
    /// True when no parameters are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a parameter value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Insert or replace a parameter, preserving position on replace
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| k == key) {
            entry.1 = Some(value.to_string());
        } else {
            self.0.push((key.to_string(), Some(value.to_string())));
        }
    }

    /// Parse a `;`-delimited fmtp config string. Bare keys map to `None`.
    pub fn from_config(config: &str) -> Self {
        let mut pairs = Vec::new();
        for part in config.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((k, v)) => pairs.push((k.trim().to_string(), Some(v.trim().to_string()))),
                None => pairs.push((part.to_string(), None)),
            }
        }
        Self(pairs)
    }

    /// Join back into a `;`-delimited config string
    pub fn to_config(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| match v {
                Some(v) => format!("{}={}", k, v),
                None => k.clone(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Serialize for FmtpParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FmtpParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = FmtpParameters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of fmtp parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
                    pairs.push((key, value));
                }
                Ok(FmtpParameters(pairs))
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

/// An RTP header extension with its fixed numeric entry id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpHeaderExtension {
    /// Extension mapping id; fixed by the capability catalog, never
    /// renegotiated
    pub entry: u16,

    /// Extension URI
    pub extension_name: String,
}

/// One direction bucket of codec/extension capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityBucket {
    /// Audio codecs
    #[serde(default)]
    pub audio_codecs: Vec<CodecCapability>,
    /// Audio header extensions
    #[serde(default)]
    pub audio_extensions: Vec<RtpHeaderExtension>,
    /// Video codecs
    #[serde(default)]
    pub video_codecs: Vec<CodecCapability>,
    /// Video header extensions
    #[serde(default)]
    pub video_extensions: Vec<RtpHeaderExtension>,
}

impl CapabilityBucket {
    /// True when no codec or extension is present in any list
    pub fn is_empty(&self) -> bool {
        self.audio_codecs.is_empty()
            && self.audio_extensions.is_empty()
            && self.video_codecs.is_empty()
            && self.video_extensions.is_empty()
    }

    /// Codec list for a media kind ("audio" / "video")
    pub fn codecs_for(&self, media_kind: &str) -> &[CodecCapability] {
        if media_kind == "video" {
            &self.video_codecs
        } else {
            &self.audio_codecs
        }
    }

    /// Extension list for a media kind ("audio" / "video")
    pub fn extensions_for(&self, media_kind: &str) -> &[RtpHeaderExtension] {
        if media_kind == "video" {
            &self.video_extensions
        } else {
            &self.audio_extensions
        }
    }
}

/// Capabilities split by direction
///
/// Some relay builds send the buckets nested under `send`/`recv`/`sendrecv`,
/// others send a single flat bucket; deserialization accepts both.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RtpCapabilities {
    /// Send-only capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send: Option<CapabilityBucket>,
    /// Receive-only capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recv: Option<CapabilityBucket>,
    /// Bidirectional capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sendrecv: Option<CapabilityBucket>,
    /// Flat bucket for relays that do not nest by direction
    #[serde(skip)]
    pub flat: Option<CapabilityBucket>,
}

impl RtpCapabilities {
    /// The bucket the answer draws codecs from: `recv`, else `sendrecv`,
    /// else the flat bucket, else an empty default
    pub fn answer_bucket(&self) -> CapabilityBucket {
        self.recv
            .clone()
            .or_else(|| self.sendrecv.clone())
            .or_else(|| self.flat.clone())
            .unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for RtpCapabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return Ok(Self::default()),
        };

        let nested = obj.contains_key("send")
            || obj.contains_key("recv")
            || obj.contains_key("sendrecv");

        let bucket = |key: &str| -> Option<CapabilityBucket> {
            obj.get(key)
                .and_then(|v| serde_json::from_value(v.clone()).ok())
        };

        if nested {
            Ok(Self {
                send: bucket("send"),
                recv: bucket("recv"),
                sendrecv: bucket("sendrecv"),
                flat: None,
            })
        } else {
            let flat: CapabilityBucket =
                serde_json::from_value(value).unwrap_or_default();
            Ok(Self {
                send: None,
                recv: None,
                sendrecv: None,
                flat: Some(flat),
            })
        }
    }
}

/// The full ORTC parameter block exchanged with the relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrtcParameters {
    /// ICE parameters
    #[serde(default)]
    pub ice_parameters: IceParameters,

    /// DTLS parameters
    #[serde(default)]
    pub dtls_parameters: DtlsParameters,

    /// Codec/extension capabilities
    #[serde(default)]
    pub rtp_capabilities: RtpCapabilities,

    /// ORTC model version advertised by the vendor SDK
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// RTCP canonical name, present in some join-success payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmtp_parameters_roundtrip() {
        let params = FmtpParameters::from_config("minptime=10;useinbandfec=1");
        assert_eq!(params.get("minptime"), Some("10"));
        assert_eq!(params.to_config(), "minptime=10;useinbandfec=1");
    }

    #[test]
    fn test_fmtp_bare_key() {
        // the red codec advertises "111/111" with no value
        let params = FmtpParameters::from_config("111/111");
        assert_eq!(params.0.len(), 1);
        assert_eq!(params.0[0], ("111/111".to_string(), None));
        assert_eq!(params.to_config(), "111/111");

        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"111/111":null}"#);
        let back: FmtpParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_codec_capability_wire_shape() {
        let json = r#"{
            "payloadType": 111,
            "rtpMap": {"encodingName": "opus", "clockRate": 48000, "encodingParameters": 2},
            "rtcpFeedbacks": [{"type": "transport-cc"}, {"type": "ccm", "parameter": "fir"}],
            "fmtp": {"parameters": {"minptime": "10"}}
        }"#;
        let codec: CodecCapability = serde_json::from_str(json).unwrap();
        assert_eq!(codec.payload_type, 111);
        assert_eq!(codec.rtp_map.encoding_name, "opus");
        assert_eq!(codec.rtp_map.encoding_parameters, Some(2));
        assert_eq!(codec.rtcp_feedbacks[1].parameter.as_deref(), Some("fir"));
        assert_eq!(codec.fmtp.parameters.get("minptime"), Some("10"));

        let out = serde_json::to_value(&codec).unwrap();
        assert_eq!(out["payloadType"], 111);
        assert_eq!(out["rtpMap"]["encodingName"], "opus");
        assert_eq!(out["rtcpFeedbacks"][0]["type"], "transport-cc");
    }

    #[test]
    fn test_fingerprint_algorithm_alias() {
        let fp: DtlsFingerprint =
            serde_json::from_str(r#"{"algorithm": "sha-256", "fingerprint": "AA:BB"}"#).unwrap();
        assert_eq!(fp.hash_function, "sha-256");
        assert_eq!(fp.fingerprint, "AA:BB");
    }

    #[test]
    fn test_rtp_capabilities_nested_and_flat() {
        let nested: RtpCapabilities = serde_json::from_str(
            r#"{"recv": {"videoCodecs": [{"payloadType": 96, "rtpMap": {"encodingName": "VP8", "clockRate": 90000}}]}}"#,
        )
        .unwrap();
        assert_eq!(nested.answer_bucket().video_codecs.len(), 1);

        let flat: RtpCapabilities = serde_json::from_str(
            r#"{"videoCodecs": [{"payloadType": 96, "rtpMap": {"encodingName": "VP8", "clockRate": 90000}}]}"#,
        )
        .unwrap();
        assert_eq!(flat.answer_bucket().video_codecs.len(), 1);
    }
}
