//! Gateway wire messages
//!
//! Outbound `join_v3` request and the tagged inbound message type. The
//! gateway frames everything as JSON text with `_id` / `_type` /
//! `_result` / `_message` envelope fields.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::TransportConfig;
use crate::credentials::RelayCredentials;
use crate::discovery::ServiceResponse;
use crate::error::Result;
use crate::ortc::{CapabilityBucket, OrtcParameters, RtpCapabilities};

use crate::discovery::unix_millis;

/// The `join_v3` request sent once after the socket opens
#[derive(Debug, Clone, Serialize)]
pub struct JoinRequest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(rename = "_message")]
    pub message: JoinBody,
}

/// Body of the join request
#[derive(Debug, Clone, Serialize)]
pub struct JoinBody {
    pub p2p_id: u32,
    pub session_id: String,
    pub app_id: String,
    pub channel_key: String,
    pub channel_name: String,
    pub sdk_version: String,
    pub browser: String,
    pub process_id: String,
    pub mode: String,
    pub codec: String,
    pub role: String,
    pub has_changed_gateway: bool,
    /// Discovery proof: the endpoint's response echoed back
    pub ap_response: Value,
    pub extend: String,
    pub details: Value,
    pub features: JoinFeatures,
    pub attributes: JoinAttributes,
    pub join_ts: u64,
    pub ortc: OrtcParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinFeatures {
    pub rejoin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinAttributes {
    #[serde(rename = "userAttributes")]
    pub user_attributes: UserAttributes,
}

/// Fixed client feature block the vendor SDK advertises
#[derive(Debug, Clone, Serialize)]
pub struct UserAttributes {
    #[serde(rename = "enableAudioMetadata")]
    pub enable_audio_metadata: bool,
    #[serde(rename = "enableAudioPts")]
    pub enable_audio_pts: bool,
    #[serde(rename = "enablePublishedUserList")]
    pub enable_published_user_list: bool,
    #[serde(rename = "maxSubscription")]
    pub max_subscription: u32,
    #[serde(rename = "enableUserLicenseCheck")]
    pub enable_user_license_check: bool,
    #[serde(rename = "enableRTX")]
    pub enable_rtx: bool,
    #[serde(rename = "enableDataStream2")]
    pub enable_data_stream2: bool,
    #[serde(rename = "enableUserAutoRebalanceCheck")]
    pub enable_user_auto_rebalance_check: bool,
    #[serde(rename = "enableXR")]
    pub enable_xr: bool,
    #[serde(rename = "enableLossbasedBwe")]
    pub enable_lossbased_bwe: bool,
    #[serde(rename = "enablePreallocPC")]
    pub enable_prealloc_pc: bool,
    #[serde(rename = "enablePubTWCC")]
    pub enable_pub_twcc: bool,
    #[serde(rename = "enableSubTWCC")]
    pub enable_sub_twcc: bool,
    #[serde(rename = "enablePubRTX")]
    pub enable_pub_rtx: bool,
    #[serde(rename = "enableSubRTX")]
    pub enable_sub_rtx: bool,
}

impl Default for UserAttributes {
    fn default() -> Self {
        Self {
            enable_audio_metadata: false,
            enable_audio_pts: false,
            enable_published_user_list: true,
            max_subscription: 50,
            enable_user_license_check: true,
            enable_rtx: true,
            enable_data_stream2: false,
            enable_user_auto_rebalance_check: true,
            enable_xr: true,
            enable_lossbased_bwe: true,
            enable_prealloc_pc: false,
            enable_pub_twcc: false,
            enable_sub_twcc: true,
            enable_pub_rtx: true,
            enable_sub_rtx: true,
        }
    }
}

impl JoinRequest {
    /// Build the join request for an audience-role live session.
    pub fn new(
        credentials: &RelayCredentials,
        discovery: &ServiceResponse,
        negotiated: &OrtcParameters,
        config: &TransportConfig,
    ) -> Result<Self> {
        Ok(Self {
            id: random_hex(3),
            kind: "join_v3".to_string(),
            message: JoinBody {
                p2p_id: 1,
                session_id: random_hex(16).to_uppercase(),
                app_id: credentials.app_id.clone(),
                channel_key: credentials.token.clone(),
                channel_name: credentials.channel_name.clone(),
                sdk_version: config.sdk_version.clone(),
                browser: config.browser.clone(),
                process_id: format!("process-{}", Uuid::new_v4()),
                mode: "live".to_string(),
                codec: "vp8".to_string(),
                role: "audience".to_string(),
                has_changed_gateway: false,
                ap_response: discovery.ap_response(None)?,
                extend: String::new(),
                details: Value::Object(Default::default()),
                features: JoinFeatures { rejoin: true },
                attributes: JoinAttributes {
                    user_attributes: UserAttributes::default(),
                },
                join_ts: unix_millis(),
                ortc: join_parameters(negotiated),
            },
        })
    }
}

/// Rearrange negotiated capabilities into the layout the gateway wants
/// from an audience: send empty, recv carrying every video codec the
/// client could decode, sendrecv carrying the bidirectional set.
fn join_parameters(negotiated: &OrtcParameters) -> OrtcParameters {
    let sendrecv = negotiated
        .rtp_capabilities
        .sendrecv
        .clone()
        .unwrap_or_default();
    let recv_only = negotiated
        .rtp_capabilities
        .recv
        .clone()
        .unwrap_or_default();

    let mut recv_video = sendrecv.video_codecs.clone();
    recv_video.extend(recv_only.video_codecs);

    OrtcParameters {
        ice_parameters: negotiated.ice_parameters.clone(),
        dtls_parameters: negotiated.dtls_parameters.clone(),
        rtp_capabilities: RtpCapabilities {
            send: Some(CapabilityBucket::default()),
            recv: Some(CapabilityBucket {
                video_codecs: recv_video,
                ..Default::default()
            }),
            sendrecv: Some(sendrecv),
            flat: None,
        },
        version: Some("2".to_string()),
        cname: None,
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Envelope fields as they arrive off the wire
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(rename = "_type")]
    kind: Option<String>,
    #[serde(rename = "_result")]
    result: Option<String>,
    #[serde(rename = "_message", default)]
    message: Value,
    error_code: Option<i64>,
    error_str: Option<String>,
}

/// A classified inbound gateway message
#[derive(Debug)]
pub struct Inbound {
    /// Correlation id, when the gateway echoes one
    pub id: Option<String>,
    pub kind: InboundMessage,
}

/// Everything the gateway is known to send
#[derive(Debug)]
pub enum InboundMessage {
    /// Direct SDP answer
    Answer { sdp: Option<String> },
    /// Join accepted; the negotiated parameters ride in `ortc`
    JoinSuccess { ortc: Option<OrtcParameters> },
    /// Peer link dropped (informational)
    PeerLost { code: Option<i64>, reason: String },
    /// Explicit error from the gateway
    ErrorNotice { detail: String },
    /// Anything unrecognized
    Unknown { kind: String },
}

impl Inbound {
    /// Parse and classify one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawInbound = serde_json::from_str(text)?;

        let kind = if raw.result.as_deref() == Some("success") {
            InboundMessage::JoinSuccess {
                ortc: raw
                    .message
                    .get("ortc")
                    .filter(|v| !v.is_null())
                    .and_then(|v| serde_json::from_value(v.clone()).ok()),
            }
        } else {
            match raw.kind.as_deref() {
                Some("answer") => InboundMessage::Answer {
                    sdp: raw
                        .message
                        .get("sdp")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                },
                Some("on_p2p_lost") => InboundMessage::PeerLost {
                    code: raw.error_code,
                    reason: raw
                        .error_str
                        .unwrap_or_else(|| "unknown error".to_string()),
                },
                Some("error") => InboundMessage::ErrorNotice {
                    detail: raw
                        .message
                        .get("error")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or(raw.error_str)
                        .unwrap_or_else(|| "unknown error".to_string()),
                },
                other => InboundMessage::Unknown {
                    kind: other.unwrap_or("").to_string(),
                },
            }
        };

        Ok(Self { id: raw.id, kind })
    }
}
