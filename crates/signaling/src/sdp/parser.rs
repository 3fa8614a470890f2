//! SDP line parser

use tracing::trace;

use crate::error::{Error, Result};

use super::model::{
    CandidateLine, ExtMapLine, FingerprintLine, FmtpLine, Group, MediaSection, MsidSemantic,
    Origin, RtcpFbLine, RtpMapLine, SdpDocument, SsrcLine,
};

/// Parse an SDP document.
///
/// Unknown line types are skipped; unrecognized attributes are kept in an
/// ordered bag so the writer can re-emit them. Fails only when the input
/// is not recognizably SDP: no `v=` line or no media sections at all.
pub fn parse(sdp: &str) -> Result<SdpDocument> {
    let mut doc = SdpDocument::default();
    let mut saw_version = false;

    for raw in sdp.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some((ltype, lval)) = line.split_once('=') else {
            continue;
        };

        match ltype {
            "v" => {
                doc.version = lval.to_string();
                saw_version = true;
            }
            "o" => {
                let parts: Vec<&str> = lval.split_whitespace().collect();
                if parts.len() >= 6 {
                    doc.origin = Some(Origin {
                        username: parts[0].to_string(),
                        session_id: parts[1].to_string(),
                        session_version: parts[2].to_string(),
                        net_type: parts[3].to_string(),
                        ip_ver: parts[4].trim_start_matches("IP").to_string(),
                        address: parts[5].to_string(),
                    });
                }
            }
            "s" => doc.session_name = Some(lval.to_string()),
            "c" => {
                let address = lval.split_whitespace().nth(2).map(str::to_string);
                if let Some(media) = doc.media.last_mut() {
                    media.connection = address;
                }
            }
            "m" => {
                let parts: Vec<&str> = lval.split_whitespace().collect();
                if parts.len() < 3 {
                    trace!(line, "skipping malformed m-line");
                    continue;
                }
                doc.media.push(MediaSection {
                    kind: parts[0].to_string(),
                    port: parts[1].parse().unwrap_or(0),
                    protocol: parts[2].to_string(),
                    payloads: parts[3..].join(" "),
                    ..Default::default()
                });
            }
            "a" => parse_attribute(&mut doc, lval),
            _ => {}
        }
    }

    if !saw_version || doc.media.is_empty() {
        return Err(Error::MalformedOffer(
            "not an SDP document: missing v= line or media sections".to_string(),
        ));
    }
    Ok(doc)
}

fn parse_attribute(doc: &mut SdpDocument, lval: &str) {
    let (attr, val) = match lval.split_once(':') {
        Some((a, v)) => (a, Some(v)),
        None => (lval, None),
    };

    // session-level attributes first
    match attr {
        "group" => {
            if let Some(val) = val {
                let mut parts = val.split_whitespace();
                if let Some(kind) = parts.next() {
                    doc.groups.push(Group {
                        kind: kind.to_string(),
                        mids: parts.collect::<Vec<_>>().join(" "),
                    });
                }
            }
            return;
        }
        "msid-semantic" => {
            if let Some(val) = val {
                let mut parts = val.split_whitespace();
                doc.msid_semantic = Some(MsidSemantic {
                    semantic: parts.next().unwrap_or("").to_string(),
                    token: parts.next().unwrap_or("").to_string(),
                });
            }
            return;
        }
        "ice-lite" => {
            doc.ice_lite = true;
            return;
        }
        "extmap-allow-mixed" => {
            doc.extmap_allow_mixed = true;
            return;
        }
        _ => {}
    }

    // bare direction attribute, valid at either level
    if val.is_none()
        && matches!(attr, "sendrecv" | "sendonly" | "recvonly" | "inactive")
    {
        if let Some(media) = doc.media.last_mut() {
            media.direction = Some(attr.to_string());
        }
        return;
    }

    match doc.media.last_mut() {
        Some(media) => parse_media_attribute(media, attr, val),
        None => parse_session_attribute(doc, attr, val),
    }
}

fn parse_session_attribute(doc: &mut SdpDocument, attr: &str, val: Option<&str>) {
    match (attr, val) {
        ("ice-ufrag", Some(v)) => doc.ice_ufrag = Some(v.to_string()),
        ("ice-pwd", Some(v)) => doc.ice_pwd = Some(v.to_string()),
        ("ice-options", Some(v)) => doc.ice_options = Some(v.to_string()),
        ("setup", Some(v)) => doc.setup = Some(v.to_string()),
        ("fingerprint", Some(v)) => {
            if let Some(fp) = parse_fingerprint(v) {
                doc.fingerprints.push(fp);
            }
        }
        _ => doc
            .attributes
            .push((attr.to_string(), val.map(str::to_string))),
    }
}

fn parse_media_attribute(media: &mut MediaSection, attr: &str, val: Option<&str>) {
    match (attr, val) {
        ("ice-ufrag", Some(v)) => media.ice_ufrag = Some(v.to_string()),
        ("ice-pwd", Some(v)) => media.ice_pwd = Some(v.to_string()),
        ("ice-options", Some(v)) => media.ice_options = Some(v.to_string()),
        ("setup", Some(v)) => media.setup = Some(v.to_string()),
        ("mid", Some(v)) => media.mid = Some(v.to_string()),
        ("rtcp-mux", _) => media.rtcp_mux = true,
        ("rtcp-rsize", _) => media.rtcp_rsize = true,
        ("fingerprint", Some(v)) => {
            if let Some(fp) = parse_fingerprint(v) {
                media.fingerprints.push(fp);
            }
        }
        ("rtcp", Some(v)) => {
            let mut parts = v.split_whitespace();
            let port = parts.next().and_then(|p| p.parse().ok()).unwrap_or(9);
            let address = parts.nth(2).unwrap_or("0.0.0.0").to_string();
            media.rtcp = Some((port, address));
        }
        ("rtpmap", Some(v)) => {
            let Some((pt, rest)) = v.split_once(char::is_whitespace) else {
                return;
            };
            let Ok(payload) = pt.parse() else { return };
            let mut fields = rest.split('/');
            let codec = fields.next().unwrap_or("").to_string();
            let rate = fields.next().and_then(|r| r.parse().ok()).unwrap_or(90_000);
            let encoding = fields.next().map(str::to_string);
            media.rtp.push(RtpMapLine {
                payload,
                codec,
                rate,
                encoding,
            });
        }
        ("fmtp", Some(v)) => {
            let Some((pt, config)) = v.split_once(char::is_whitespace) else {
                return;
            };
            if let Ok(payload) = pt.parse() {
                media.fmtp.push(FmtpLine {
                    payload,
                    config: config.to_string(),
                });
            }
        }
        ("rtcp-fb", Some(v)) => {
            let parts: Vec<&str> = v.split_whitespace().collect();
            if parts.len() < 2 {
                return;
            }
            if let Ok(payload) = parts[0].parse() {
                media.rtcp_fb.push(RtcpFbLine {
                    payload,
                    kind: parts[1].to_string(),
                    subtype: if parts.len() > 2 {
                        Some(parts[2..].join(" "))
                    } else {
                        None
                    },
                });
            }
        }
        ("extmap", Some(v)) => {
            let parts: Vec<&str> = v.split_whitespace().collect();
            if parts.len() < 2 {
                return;
            }
            // strip a direction suffix such as "2/recvonly"
            let id_part = parts[0].split('/').next().unwrap_or(parts[0]);
            if let Ok(id) = id_part.parse() {
                media.ext.push(ExtMapLine {
                    id,
                    uri: parts[1].to_string(),
                });
            }
        }
        ("ssrc", Some(v)) => {
            let Some((id, rest)) = v.split_once(char::is_whitespace) else {
                return;
            };
            let Ok(id) = id.parse() else { return };
            let (attribute, value) = match rest.split_once(':') {
                Some((a, v)) => (a.to_string(), v.to_string()),
                None => (rest.to_string(), String::new()),
            };
            media.ssrcs.push(SsrcLine {
                id,
                attribute,
                value,
            });
        }
        ("candidate", Some(v)) => {
            let parts: Vec<&str> = v.split_whitespace().collect();
            // "<foundation> <component> <protocol> <priority> <ip> <port> typ <type>"
            if parts.len() >= 8 && parts[6] == "typ" {
                media.candidates.push(CandidateLine {
                    foundation: parts[0].to_string(),
                    component: parts[1].parse().unwrap_or(1),
                    protocol: parts[2].to_string(),
                    priority: parts[3].parse().unwrap_or(0),
                    ip: parts[4].to_string(),
                    port: parts[5].parse().unwrap_or(0),
                    kind: parts[7].to_string(),
                });
            }
        }
        _ => media
            .attributes
            .push((attr.to_string(), val.map(str::to_string))),
    }
}

fn parse_fingerprint(val: &str) -> Option<FingerprintLine> {
    let mut parts = val.split_whitespace();
    let hash = parts.next()?.to_string();
    let fingerprint = parts.next()?.to_string();
    Some(FingerprintLine { hash, fingerprint })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
a=msid-semantic: WMS stream\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111 63\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:F7gI\r\n\
a=ice-pwd:x9cml/YzichV2+XlhiMu8g\r\n\
a=fingerprint:sha-256 D2:FA:0E:C3:22:59:5E:14:95:69:92:3D:13:B5:D1:38:EC:95:6D:85:84:4E:23:86:A9:1D:A1:26:64:13:2B:DD\r\n\
a=setup:actpass\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtcp-fb:111 transport-cc\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=extmap:14 urn:ietf:params:rtp-hdrext:ssrc-audio-level\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=recvonly\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n";

    #[test]
    fn test_parse_offer_structure() {
        let doc = parse(OFFER).unwrap();
        assert_eq!(doc.version, "0");
        assert_eq!(doc.origin.as_ref().unwrap().session_id, "4611731400430051336");
        assert_eq!(doc.groups[0].kind, "BUNDLE");
        assert_eq!(doc.groups[0].mids, "0 1");
        assert_eq!(doc.msid_semantic.as_ref().unwrap().semantic, "WMS");
        assert_eq!(doc.media.len(), 2);

        let audio = &doc.media[0];
        assert_eq!(audio.kind, "audio");
        assert_eq!(audio.payloads, "111 63");
        assert_eq!(audio.mid.as_deref(), Some("0"));
        assert_eq!(audio.direction.as_deref(), Some("sendrecv"));
        assert!(audio.rtcp_mux);
        assert_eq!(audio.rtp[0].codec, "opus");
        assert_eq!(audio.rtp[0].encoding.as_deref(), Some("2"));
        assert_eq!(audio.ext[0].id, 14);
        assert_eq!(audio.fingerprints.len(), 1);

        let video = &doc.media[1];
        assert_eq!(video.direction.as_deref(), Some("recvonly"));
        assert_eq!(video.rtcp_fb[0].kind, "nack");
        assert_eq!(video.rtcp_fb[0].subtype.as_deref(), Some("pli"));
    }

    #[test]
    fn test_ice_credentials_fall_back_to_media_level() {
        let doc = parse(OFFER).unwrap();
        let (ufrag, pwd) = doc.ice_credentials().unwrap();
        assert_eq!(ufrag, "F7gI");
        assert_eq!(pwd, "x9cml/YzichV2+XlhiMu8g");
    }

    #[test]
    fn test_parse_rejects_non_sdp() {
        assert!(parse("hello world").is_err());
        assert!(parse("v=0\r\ns=-\r\n").is_err());
    }

    #[test]
    fn test_unknown_attributes_ignored() {
        let sdp = "v=0\r\ns=-\r\nm=audio 9 RTP/AVP 0\r\na=bogus:thing\r\na=rtpmap:0 PCMU/8000\r\n";
        let doc = parse(sdp).unwrap();
        assert_eq!(doc.media[0].rtp.len(), 1);
    }
}
