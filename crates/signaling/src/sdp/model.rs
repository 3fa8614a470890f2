//! In-memory SDP document model

/// `o=` line fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: String,
    pub session_version: String,
    pub net_type: String,
    pub ip_ver: String,
    pub address: String,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            username: "-".to_string(),
            session_id: "0".to_string(),
            session_version: "0".to_string(),
            net_type: "IN".to_string(),
            ip_ver: "4".to_string(),
            address: "127.0.0.1".to_string(),
        }
    }
}

/// `a=group:` line, e.g. `BUNDLE 0 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: String,
    pub mids: String,
}

/// `a=msid-semantic:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsidSemantic {
    pub semantic: String,
    pub token: String,
}

/// `a=rtpmap:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMapLine {
    pub payload: u8,
    pub codec: String,
    pub rate: u32,
    /// Trailing encoding parameter (channel count for audio)
    pub encoding: Option<String>,
}

/// `a=fmtp:` line, config kept as the raw `;`-joined string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmtpLine {
    pub payload: u8,
    pub config: String,
}

/// `a=rtcp-fb:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpFbLine {
    pub payload: u8,
    pub kind: String,
    pub subtype: Option<String>,
}

/// `a=extmap:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtMapLine {
    pub id: u16,
    pub uri: String,
}

/// `a=fingerprint:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintLine {
    pub hash: String,
    pub fingerprint: String,
}

/// `a=ssrc:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcLine {
    pub id: u64,
    pub attribute: String,
    pub value: String,
}

/// `a=candidate:` line (host/srflx/relay)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLine {
    pub foundation: String,
    pub component: u32,
    pub protocol: String,
    pub priority: u64,
    pub ip: String,
    pub port: u16,
    pub kind: String,
}

/// One `m=` section with its attributes
#[derive(Debug, Clone, Default)]
pub struct MediaSection {
    /// Media kind ("audio" / "video" / "application")
    pub kind: String,
    pub port: u16,
    pub protocol: String,
    /// Space-separated payload type list from the m-line
    pub payloads: String,
    /// `c=` address, when present
    pub connection: Option<String>,
    /// `a=rtcp:` port/address, when present
    pub rtcp: Option<(u16, String)>,
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub ice_options: Option<String>,
    pub fingerprints: Vec<FingerprintLine>,
    pub setup: Option<String>,
    pub mid: Option<String>,
    /// "sendrecv" / "sendonly" / "recvonly" / "inactive"
    pub direction: Option<String>,
    pub rtp: Vec<RtpMapLine>,
    pub fmtp: Vec<FmtpLine>,
    pub rtcp_fb: Vec<RtcpFbLine>,
    pub ext: Vec<ExtMapLine>,
    pub rtcp_mux: bool,
    pub rtcp_rsize: bool,
    pub ssrcs: Vec<SsrcLine>,
    pub candidates: Vec<CandidateLine>,
    /// Unrecognized attributes, preserved verbatim in order. `None`
    /// values are bare flag attributes.
    pub attributes: Vec<(String, Option<String>)>,
}

/// A parsed SDP document
#[derive(Debug, Clone, Default)]
pub struct SdpDocument {
    pub version: String,
    pub origin: Option<Origin>,
    pub session_name: Option<String>,
    pub groups: Vec<Group>,
    pub msid_semantic: Option<MsidSemantic>,
    pub ice_lite: bool,
    pub extmap_allow_mixed: bool,
    /// Session-level ICE credentials (media sections may carry their own)
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub ice_options: Option<String>,
    pub fingerprints: Vec<FingerprintLine>,
    pub setup: Option<String>,
    /// Unrecognized session-level attributes, preserved verbatim in order
    pub attributes: Vec<(String, Option<String>)>,
    pub media: Vec<MediaSection>,
}

impl SdpDocument {
    /// First available ICE credentials, session level before media level
    pub fn ice_credentials(&self) -> Option<(&str, &str)> {
        if let (Some(u), Some(p)) = (self.ice_ufrag.as_deref(), self.ice_pwd.as_deref()) {
            return Some((u, p));
        }
        self.media.iter().find_map(|m| {
            match (m.ice_ufrag.as_deref(), m.ice_pwd.as_deref()) {
                (Some(u), Some(p)) => Some((u, p)),
                _ => None,
            }
        })
    }

    /// First available fingerprint list, session level before media level
    pub fn fingerprint_lines(&self) -> &[FingerprintLine] {
        if !self.fingerprints.is_empty() {
            return &self.fingerprints;
        }
        self.media
            .iter()
            .find(|m| !m.fingerprints.is_empty())
            .map(|m| m.fingerprints.as_slice())
            .unwrap_or(&[])
    }
}
