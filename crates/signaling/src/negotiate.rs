//! Offer-to-ORTC capability mapping
//!
//! Converts a parsed browser offer into the ORTC parameter block the
//! relay expects in the join message. Codecs are bucketed by direction
//! using the send-eligibility policy below; everything offered is assumed
//! receivable by the offerer.

use tracing::debug;

use crate::error::Result;
use crate::ortc::{
    CapabilityBucket, CodecCapability, DtlsFingerprint, DtlsParameters, Fmtp, FmtpParameters,
    IceParameters, OrtcParameters, RtcpFeedback, RtpCapabilities, RtpHeaderExtension, RtpMap,
};
use crate::sdp::{MediaSection, SdpDocument};

/// Whether the relay may send this codec back to us.
///
/// H265 is decode-only in browsers. VP9 profiles 1 and 3 and AV1
/// profile 1 are high-bit-depth variants browsers advertise for receive
/// only.
pub fn can_send(codec: &CodecCapability) -> bool {
    let name = codec.rtp_map.encoding_name.to_ascii_uppercase();
    let params = &codec.fmtp.parameters;

    match name.as_str() {
        "H265" => false,
        "VP9" => !matches!(params.get("profile-id"), Some("1") | Some("3")),
        "AV1" => params.get("profile") != Some("1"),
        _ => true,
    }
}

/// Map an offer document to ORTC parameters.
pub fn offer_to_ortc(offer: &SdpDocument) -> Result<OrtcParameters> {
    let ice_parameters = offer
        .ice_credentials()
        .map(|(ufrag, pwd)| IceParameters {
            ice_ufrag: ufrag.to_string(),
            ice_pwd: pwd.to_string(),
            candidates: Vec::new(),
        })
        .unwrap_or_default();

    let dtls_parameters = DtlsParameters {
        role: None,
        fingerprints: offer
            .fingerprint_lines()
            .iter()
            .map(|fp| DtlsFingerprint {
                hash_function: fp.hash.clone(),
                fingerprint: fp.fingerprint.clone(),
            })
            .collect(),
    };

    // the send bucket stays empty for an audience-role client
    let send = CapabilityBucket::default();
    let mut recv = CapabilityBucket::default();
    let mut sendrecv = CapabilityBucket::default();

    for media in &offer.media {
        for codec in media_codecs(media) {
            let bucket = if can_send(&codec) { &mut sendrecv } else { &mut recv };
            match media.kind.as_str() {
                "audio" => bucket.audio_codecs.push(codec),
                "video" => bucket.video_codecs.push(codec),
                _ => {}
            }
        }

        let extensions: Vec<RtpHeaderExtension> = media
            .ext
            .iter()
            .map(|e| RtpHeaderExtension {
                entry: e.id,
                extension_name: e.uri.clone(),
            })
            .collect();
        match media.kind.as_str() {
            "audio" => sendrecv.audio_extensions.extend(extensions),
            "video" => sendrecv.video_extensions.extend(extensions),
            _ => {}
        }
    }

    debug!(
        sendrecv_video = sendrecv.video_codecs.len(),
        recv_only_video = recv.video_codecs.len(),
        "bucketed offer capabilities"
    );

    Ok(OrtcParameters {
        ice_parameters,
        dtls_parameters,
        rtp_capabilities: RtpCapabilities {
            send: Some(send),
            recv: Some(recv),
            sendrecv: Some(sendrecv),
            flat: None,
        },
        version: Some("2".to_string()),
        cname: None,
    })
}

/// Assemble codec capabilities for one media section, joining rtpmap,
/// rtcp-fb and fmtp lines by payload type and forcing an rrtr feedback
/// entry when the offer omits it.
fn media_codecs(media: &MediaSection) -> Vec<CodecCapability> {
    media
        .rtp
        .iter()
        .map(|rtp| {
            let mut feedbacks: Vec<RtcpFeedback> = media
                .rtcp_fb
                .iter()
                .filter(|fb| fb.payload == rtp.payload)
                .map(|fb| RtcpFeedback {
                    kind: fb.kind.clone(),
                    parameter: fb.subtype.clone(),
                })
                .collect();
            if !feedbacks.iter().any(|fb| fb.kind == "rrtr") {
                feedbacks.push(RtcpFeedback::plain("rrtr"));
            }

            let parameters = media
                .fmtp
                .iter()
                .filter(|f| f.payload == rtp.payload)
                .fold(FmtpParameters::default(), |mut acc, f| {
                    for (k, v) in FmtpParameters::from_config(&f.config).0 {
                        acc.0.push((k, v));
                    }
                    acc
                });

            CodecCapability {
                payload_type: rtp.payload,
                rtp_map: RtpMap {
                    encoding_name: rtp.codec.clone(),
                    clock_rate: rtp.rate,
                    encoding_parameters: rtp.encoding.as_deref().and_then(|e| e.parse().ok()),
                },
                rtcp_feedbacks: feedbacks,
                fmtp: Fmtp { parameters },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::sdp;

    const OFFER: &str = "v=0\r\n\
o=- 1 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=ice-ufrag:F7gI\r\n\
a=ice-pwd:secretpwd\r\n\
a=fingerprint:sha-256 AA:BB:CC\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtcp-fb:111 transport-cc\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=extmap:14 urn:ietf:params:rtp-hdrext:ssrc-audio-level\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 98 35 49\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=rtpmap:98 VP9/90000\r\n\
a=fmtp:98 profile-id=0\r\n\
a=rtpmap:35 VP9/90000\r\n\
a=fmtp:35 profile-id=1\r\n\
a=rtpmap:49 H265/90000\r\n\
a=extmap:2 http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time\r\n";

    #[test]
    fn test_send_policy_matches_catalog_split() {
        for codec in catalog::video_codecs_sendrecv() {
            if codec.rtp_map.encoding_name != "rtx" {
                assert!(can_send(&codec), "{} should be sendable", codec.payload_type);
            }
        }
        for codec in catalog::video_codecs_recv_only() {
            if codec.rtp_map.encoding_name != "rtx" {
                assert!(!can_send(&codec), "{} should be recv-only", codec.payload_type);
            }
        }
    }

    #[test]
    fn test_offer_buckets_by_send_eligibility() {
        let doc = sdp::parse(OFFER).unwrap();
        let ortc = offer_to_ortc(&doc).unwrap();
        let caps = &ortc.rtp_capabilities;

        let sendrecv = caps.sendrecv.as_ref().unwrap();
        let recv = caps.recv.as_ref().unwrap();

        let pts = |bucket: &CapabilityBucket| {
            bucket
                .video_codecs
                .iter()
                .map(|c| c.payload_type)
                .collect::<Vec<_>>()
        };
        assert_eq!(pts(sendrecv), vec![96, 98]);
        assert_eq!(pts(recv), vec![35, 49]);
        assert!(caps.send.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_rrtr_injected_when_missing() {
        let doc = sdp::parse(OFFER).unwrap();
        let ortc = offer_to_ortc(&doc).unwrap();
        let sendrecv = ortc.rtp_capabilities.sendrecv.unwrap();

        let opus = &sendrecv.audio_codecs[0];
        assert!(opus.rtcp_feedbacks.iter().any(|fb| fb.kind == "transport-cc"));
        assert!(opus.rtcp_feedbacks.iter().any(|fb| fb.kind == "rrtr"));

        let vp8 = sendrecv.video_codecs.iter().find(|c| c.payload_type == 96).unwrap();
        assert!(vp8
            .rtcp_feedbacks
            .iter()
            .any(|fb| fb.kind == "nack" && fb.parameter.as_deref() == Some("pli")));
        assert!(vp8.rtcp_feedbacks.iter().any(|fb| fb.kind == "rrtr"));
    }

    #[test]
    fn test_ice_and_dtls_extracted() {
        let doc = sdp::parse(OFFER).unwrap();
        let ortc = offer_to_ortc(&doc).unwrap();
        assert_eq!(ortc.ice_parameters.ice_ufrag, "F7gI");
        assert_eq!(ortc.ice_parameters.ice_pwd, "secretpwd");
        assert_eq!(ortc.dtls_parameters.fingerprints[0].fingerprint, "AA:BB:CC");
        assert_eq!(ortc.version.as_deref(), Some("2"));
    }

    #[test]
    fn test_extensions_land_in_sendrecv() {
        let doc = sdp::parse(OFFER).unwrap();
        let ortc = offer_to_ortc(&doc).unwrap();
        let sendrecv = ortc.rtp_capabilities.sendrecv.unwrap();
        assert_eq!(sendrecv.audio_extensions[0].entry, 14);
        assert_eq!(sendrecv.video_extensions[0].entry, 2);
    }
}
