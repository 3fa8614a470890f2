//! SDP answer synthesis
//!
//! Turns the gateway's negotiated ORTC parameters back into an answer
//! SDP the browser peer accepts. Synthesis never hard-fails: a document
//! that comes out structurally broken is replaced by a self-contained
//! fallback answer so the stream setup can still proceed.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use crate::ortc::{IceParameters, OrtcParameters};
use crate::sdp::{
    self, CandidateLine, ExtMapLine, FingerprintLine, FmtpLine, Group, MediaSection,
    MsidSemantic, RtcpFbLine, RtpMapLine, SdpDocument,
};

/// Synthesize an answer for `offer` from the gateway's parameters.
///
/// `force_setup` overrides the DTLS-role-derived setup attribute.
pub fn synthesize_answer(
    ortc: &OrtcParameters,
    offer: &SdpDocument,
    force_setup: Option<&str>,
) -> String {
    let candidate = build_answer(ortc, offer, force_setup);
    let text = sdp::write(&candidate);
    if sdp::is_answer_usable(&text) {
        text
    } else {
        warn!("synthesized answer unusable, substituting fallback");
        fallback_answer()
    }
}

fn build_answer(ortc: &OrtcParameters, offer: &SdpDocument, force_setup: Option<&str>) -> SdpDocument {
    // server is ICE/DTLS server -> we stay passive; client -> active
    let role = ortc.dtls_parameters.role.as_deref().unwrap_or("server");
    let setup = force_setup
        .map(str::to_string)
        .unwrap_or_else(|| match role {
            "server" => "passive".to_string(),
            "client" => "active".to_string(),
            _ => "actpass".to_string(),
        });

    let ice = effective_ice(&ortc.ice_parameters);
    let fingerprints = effective_fingerprints(ortc);
    let bucket = ortc.rtp_capabilities.answer_bucket();

    // map extension URIs back to the ids the offer advertised
    let offer_ext_ids: HashMap<&str, u16> = offer
        .media
        .iter()
        .flat_map(|m| m.ext.iter())
        .map(|e| (e.uri.as_str(), e.id))
        .collect();

    let groups = if offer.groups.is_empty() {
        vec![Group {
            kind: "BUNDLE".to_string(),
            mids: "0 1".to_string(),
        }]
    } else {
        offer.groups.clone()
    };
    let msid_semantic = offer.msid_semantic.clone().or(Some(MsidSemantic {
        semantic: "WMS".to_string(),
        token: String::new(),
    }));

    let mut answer = SdpDocument {
        version: "0".to_string(),
        origin: Some(Default::default()),
        session_name: Some("AgoraGateway".to_string()),
        groups,
        msid_semantic,
        ice_lite: true,
        extmap_allow_mixed: true,
        ..Default::default()
    };

    for (idx, offer_media) in offer.media.iter().enumerate() {
        let codecs = bucket.codecs_for(&offer_media.kind);
        let mid = offer_media
            .mid
            .clone()
            .unwrap_or_else(|| idx.to_string());

        let mut section = MediaSection {
            kind: offer_media.kind.clone(),
            port: 9,
            protocol: "UDP/TLS/RTP/SAVPF".to_string(),
            payloads: codecs
                .iter()
                .map(|c| c.payload_type.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            connection: Some("0.0.0.0".to_string()),
            rtcp: Some((9, "0.0.0.0".to_string())),
            ice_ufrag: Some(ice.ice_ufrag.clone()),
            ice_pwd: Some(ice.ice_pwd.clone()),
            ice_options: Some("trickle".to_string()),
            fingerprints: fingerprints.clone(),
            setup: Some(setup.clone()),
            mid: Some(mid),
            direction: Some("sendonly".to_string()),
            rtcp_mux: true,
            rtcp_rsize: true,
            ..Default::default()
        };

        for codec in codecs {
            section.rtp.push(RtpMapLine {
                payload: codec.payload_type,
                codec: codec.rtp_map.encoding_name.clone(),
                rate: codec.rtp_map.clock_rate,
                encoding: codec.rtp_map.encoding_parameters.map(|e| e.to_string()),
            });
            for fb in &codec.rtcp_feedbacks {
                section.rtcp_fb.push(RtcpFbLine {
                    payload: codec.payload_type,
                    kind: fb.kind.clone(),
                    subtype: fb.parameter.clone(),
                });
            }

            let mut params = codec.fmtp.parameters.clone();
            if codec.rtp_map.encoding_name.eq_ignore_ascii_case("opus") {
                params.set("stereo", "1");
                params.set("sprop-stereo", "1");
            }
            if !params.is_empty() {
                section.fmtp.push(FmtpLine {
                    payload: codec.payload_type,
                    config: params.to_config(),
                });
            }
        }

        for ext in bucket.extensions_for(&offer_media.kind) {
            if let Some(&id) = offer_ext_ids.get(ext.extension_name.as_str()) {
                section.ext.push(ExtMapLine {
                    id,
                    uri: ext.extension_name.clone(),
                });
            }
        }

        for c in &ortc.ice_parameters.candidates {
            section.candidates.push(CandidateLine {
                foundation: c.foundation.clone(),
                component: c.component,
                protocol: c.protocol.clone(),
                priority: c.priority,
                ip: c.ip.clone(),
                port: c.port,
                kind: c.kind.clone(),
            });
        }

        answer.media.push(section);
    }

    debug!(
        media = answer.media.len(),
        setup = setup.as_str(),
        "built answer document"
    );
    answer
}

fn effective_ice(ice: &IceParameters) -> IceParameters {
    let mut out = ice.clone();
    if out.ice_ufrag.is_empty() {
        out.ice_ufrag = random_hex(4);
        warn!("gateway sent no ICE ufrag, using a random one");
    }
    if out.ice_pwd.is_empty() {
        out.ice_pwd = random_hex(16);
        warn!("gateway sent no ICE pwd, using a random one");
    }
    out
}

fn effective_fingerprints(ortc: &OrtcParameters) -> Vec<FingerprintLine> {
    let real: Vec<FingerprintLine> = ortc
        .dtls_parameters
        .fingerprints
        .iter()
        .filter(|fp| !fp.fingerprint.is_empty())
        .map(|fp| FingerprintLine {
            hash: fp.hash_function.clone(),
            fingerprint: fp.fingerprint.clone(),
        })
        .collect();
    if !real.is_empty() {
        return real;
    }
    warn!("gateway sent no DTLS fingerprint, using a placeholder");
    vec![FingerprintLine {
        hash: "sha-256".to_string(),
        fingerprint: random_fingerprint(),
    }]
}

/// Self-contained degraded answer: Opus and VP8 on fixed payload types
/// with fresh random ICE credentials and a placeholder fingerprint.
/// Structurally valid by construction.
pub fn fallback_answer() -> String {
    let ice_ufrag = random_hex(4);
    let ice_pwd = random_hex(16);
    let fingerprint = FingerprintLine {
        hash: "sha-256".to_string(),
        fingerprint: random_fingerprint(),
    };

    let section = |kind: &str, mid: &str, payload: u8, codec: &str, rate: u32, channels: Option<&str>| {
        MediaSection {
            kind: kind.to_string(),
            port: 9,
            protocol: "UDP/TLS/RTP/SAVPF".to_string(),
            payloads: payload.to_string(),
            connection: Some("0.0.0.0".to_string()),
            rtcp: Some((9, "0.0.0.0".to_string())),
            ice_ufrag: Some(ice_ufrag.clone()),
            ice_pwd: Some(ice_pwd.clone()),
            ice_options: Some("trickle".to_string()),
            fingerprints: vec![fingerprint.clone()],
            setup: Some("active".to_string()),
            mid: Some(mid.to_string()),
            direction: Some("sendrecv".to_string()),
            rtp: vec![RtpMapLine {
                payload,
                codec: codec.to_string(),
                rate,
                encoding: channels.map(str::to_string),
            }],
            rtcp_mux: true,
            ..Default::default()
        }
    };

    let doc = SdpDocument {
        version: "0".to_string(),
        origin: Some(sdp::Origin {
            session_id: rand::thread_rng().gen_range(0..i64::MAX as u64).to_string(),
            session_version: "2".to_string(),
            ..Default::default()
        }),
        session_name: Some("-".to_string()),
        groups: vec![Group {
            kind: "BUNDLE".to_string(),
            mids: "0 1".to_string(),
        }],
        msid_semantic: Some(MsidSemantic {
            semantic: "WMS".to_string(),
            token: String::new(),
        }),
        media: vec![
            section("audio", "0", 109, "opus", 48_000, Some("2")),
            section("video", "1", 120, "VP8", 90_000, None),
        ],
        ..Default::default()
    };

    sdp::write(&doc)
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}

fn random_fingerprint() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| format!("{:02X}", rng.gen::<u8>()))
        .collect::<Vec<_>>()
        .join(":")
}
