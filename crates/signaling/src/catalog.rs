//! Static codec and header-extension capability catalog
//!
//! These tables mirror the vendor browser SDK's advertised capabilities.
//! Payload type numbers and extension entry ids are fixed by the catalog
//! and are never renegotiated.

use crate::ortc::{
    CapabilityBucket, CodecCapability, Fmtp, FmtpParameters, RtcpFeedback, RtpHeaderExtension,
    RtpMap,
};

/// Standard video RTCP feedback set shared by every primary video codec
fn video_feedbacks() -> Vec<RtcpFeedback> {
    vec![
        RtcpFeedback::plain("goog-remb"),
        RtcpFeedback::plain("transport-cc"),
        RtcpFeedback::with_parameter("ccm", "fir"),
        RtcpFeedback::plain("nack"),
        RtcpFeedback::with_parameter("nack", "pli"),
        RtcpFeedback::plain("rrtr"),
    ]
}

fn codec(
    payload_type: u8,
    name: &str,
    clock_rate: u32,
    channels: Option<u32>,
    feedbacks: Vec<RtcpFeedback>,
    fmtp: &str,
) -> CodecCapability {
    CodecCapability {
        payload_type,
        rtp_map: RtpMap {
            encoding_name: name.to_string(),
            clock_rate,
            encoding_parameters: channels,
        },
        rtcp_feedbacks: feedbacks,
        fmtp: Fmtp {
            parameters: FmtpParameters::from_config(fmtp),
        },
    }
}

fn video_codec(payload_type: u8, name: &str, fmtp: &str) -> CodecCapability {
    codec(payload_type, name, 90_000, None, video_feedbacks(), fmtp)
}

/// Retransmission codec bound to a primary payload type
fn rtx(payload_type: u8, apt: u8) -> CodecCapability {
    codec(
        payload_type,
        "rtx",
        90_000,
        None,
        vec![RtcpFeedback::plain("rrtr")],
        &format!("apt={}", apt),
    )
}

/// Audio codec list (bidirectional)
pub fn audio_codecs() -> Vec<CodecCapability> {
    let rrtr = || vec![RtcpFeedback::plain("rrtr")];
    vec![
        codec(
            111,
            "opus",
            48_000,
            Some(2),
            vec![RtcpFeedback::plain("transport-cc"), RtcpFeedback::plain("rrtr")],
            "minptime=10;useinbandfec=1",
        ),
        codec(63, "red", 48_000, Some(2), rrtr(), "111/111"),
        codec(9, "G722", 8_000, None, rrtr(), ""),
        codec(0, "PCMU", 8_000, None, rrtr(), ""),
        codec(8, "PCMA", 8_000, None, rrtr(), ""),
        codec(13, "CN", 8_000, None, rrtr(), ""),
        codec(110, "telephone-event", 48_000, None, rrtr(), ""),
        codec(126, "telephone-event", 8_000, None, rrtr(), ""),
    ]
}

/// Video codecs offered in both directions
pub fn video_codecs_sendrecv() -> Vec<CodecCapability> {
    let h264 = |fmtp: &str| {
        format!(
            "level-asymmetry-allowed=1;{}",
            fmtp
        )
    };
    vec![
        video_codec(96, "VP8", ""),
        rtx(97, 96),
        video_codec(103, "H264", &h264("packetization-mode=1;profile-level-id=42001f")),
        rtx(104, 103),
        video_codec(107, "H264", &h264("packetization-mode=0;profile-level-id=42001f")),
        rtx(108, 107),
        video_codec(109, "H264", &h264("packetization-mode=1;profile-level-id=42e01f")),
        rtx(114, 109),
        video_codec(115, "H264", &h264("packetization-mode=0;profile-level-id=42e01f")),
        rtx(116, 115),
        video_codec(117, "H264", &h264("packetization-mode=1;profile-level-id=4d001f")),
        rtx(118, 117),
        video_codec(39, "H264", &h264("packetization-mode=0;profile-level-id=4d001f")),
        rtx(40, 39),
        video_codec(45, "AV1", "level-idx=5;profile=0;tier=0"),
        rtx(46, 45),
        video_codec(98, "VP9", "profile-id=0"),
        rtx(99, 98),
        video_codec(100, "VP9", "profile-id=2"),
        rtx(101, 100),
    ]
}

/// Video codecs the client can only receive (high VP9/AV1 profiles, H265)
pub fn video_codecs_recv_only() -> Vec<CodecCapability> {
    vec![
        video_codec(35, "VP9", "profile-id=1"),
        rtx(36, 35),
        video_codec(37, "VP9", "profile-id=3"),
        rtx(38, 37),
        video_codec(47, "AV1", "level-idx=5;profile=1;tier=0"),
        rtx(48, 47),
        video_codec(49, "H265", "level-id=180;profile-id=1;tier-flag=0;tx-mode=SRST"),
        rtx(50, 49),
        video_codec(51, "H265", "level-id=180;profile-id=2;tier-flag=0;tx-mode=SRST"),
        rtx(52, 51),
    ]
}

fn extension(entry: u16, uri: &str) -> RtpHeaderExtension {
    RtpHeaderExtension {
        entry,
        extension_name: uri.to_string(),
    }
}

/// Audio RTP header extensions with fixed entry ids
pub fn audio_extensions() -> Vec<RtpHeaderExtension> {
    vec![
        extension(14, "urn:ietf:params:rtp-hdrext:ssrc-audio-level"),
        extension(2, "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time"),
        extension(
            4,
            "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
        ),
        extension(9, "urn:ietf:params:rtp-hdrext:sdes:mid"),
    ]
}

/// Video RTP header extensions with fixed entry ids
pub fn video_extensions() -> Vec<RtpHeaderExtension> {
    vec![
        extension(1, "urn:ietf:params:rtp-hdrext:toffset"),
        extension(2, "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time"),
        extension(3, "urn:3gpp:video-orientation"),
        extension(
            4,
            "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
        ),
        extension(5, "http://www.webrtc.org/experiments/rtp-hdrext/playout-delay"),
        extension(
            6,
            "http://www.webrtc.org/experiments/rtp-hdrext/video-content-type",
        ),
        extension(7, "http://www.webrtc.org/experiments/rtp-hdrext/video-timing"),
        extension(8, "http://www.webrtc.org/experiments/rtp-hdrext/color-space"),
        extension(9, "urn:ietf:params:rtp-hdrext:sdes:mid"),
        extension(10, "urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id"),
        extension(
            11,
            "urn:ietf:params:rtp-hdrext:sdes:repaired-rtp-stream-id",
        ),
    ]
}

/// Full receive-direction bucket: everything in the catalog
pub fn recv_bucket() -> CapabilityBucket {
    let mut video_codecs = video_codecs_sendrecv();
    video_codecs.extend(video_codecs_recv_only());
    CapabilityBucket {
        audio_codecs: audio_codecs(),
        audio_extensions: audio_extensions(),
        video_codecs,
        video_extensions: video_extensions(),
    }
}

/// Bidirectional bucket: the catalog minus recv-only video codecs
pub fn sendrecv_bucket() -> CapabilityBucket {
    CapabilityBucket {
        audio_codecs: audio_codecs(),
        audio_extensions: audio_extensions(),
        video_codecs: video_codecs_sendrecv(),
        video_extensions: video_extensions(),
    }
}
