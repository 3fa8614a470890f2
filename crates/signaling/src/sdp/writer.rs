//! SDP serializer
//!
//! Emits lines in the fixed order the vendor gateway uses; the timing
//! line is always `t=0 0`.

use super::model::{Origin, SdpDocument};

/// Serialize a document to SDP text with CRLF line endings.
pub fn write(doc: &SdpDocument) -> String {
    let mut lines: Vec<String> = Vec::new();

    let version = if doc.version.is_empty() { "0" } else { &doc.version };
    lines.push(format!("v={}", version));

    let origin = doc.origin.clone().unwrap_or_default();
    lines.push(origin_line(&origin));
    lines.push(format!(
        "s={}",
        doc.session_name.as_deref().unwrap_or("-")
    ));
    lines.push("t=0 0".to_string());

    for group in &doc.groups {
        lines.push(format!("a=group:{} {}", group.kind, group.mids));
    }
    if let Some(msid) = &doc.msid_semantic {
        lines.push(format!(
            "a=msid-semantic: {} {}",
            msid.semantic, msid.token
        ));
    }
    if doc.ice_lite {
        lines.push("a=ice-lite".to_string());
    }
    if doc.extmap_allow_mixed {
        lines.push("a=extmap-allow-mixed".to_string());
    }
    if let Some(v) = &doc.ice_ufrag {
        lines.push(format!("a=ice-ufrag:{}", v));
    }
    if let Some(v) = &doc.ice_pwd {
        lines.push(format!("a=ice-pwd:{}", v));
    }
    if let Some(v) = &doc.ice_options {
        lines.push(format!("a=ice-options:{}", v));
    }
    for fp in &doc.fingerprints {
        lines.push(format!("a=fingerprint:{} {}", fp.hash, fp.fingerprint));
    }
    if let Some(v) = &doc.setup {
        lines.push(format!("a=setup:{}", v));
    }
    for (attr, val) in &doc.attributes {
        lines.push(attribute_line(attr, val));
    }

    for media in &doc.media {
        lines.push(format!(
            "m={} {} {} {}",
            media.kind, media.port, media.protocol, media.payloads
        ));
        lines.push(format!(
            "c=IN IP4 {}",
            media.connection.as_deref().unwrap_or("0.0.0.0")
        ));
        if let Some((port, address)) = &media.rtcp {
            lines.push(format!("a=rtcp:{} IN IP4 {}", port, address));
        }
        if let Some(v) = &media.ice_ufrag {
            lines.push(format!("a=ice-ufrag:{}", v));
        }
        if let Some(v) = &media.ice_pwd {
            lines.push(format!("a=ice-pwd:{}", v));
        }
        if let Some(v) = &media.ice_options {
            lines.push(format!("a=ice-options:{}", v));
        }
        for fp in &media.fingerprints {
            lines.push(format!("a=fingerprint:{} {}", fp.hash, fp.fingerprint));
        }
        if let Some(v) = &media.setup {
            lines.push(format!("a=setup:{}", v));
        }
        if let Some(v) = &media.mid {
            lines.push(format!("a=mid:{}", v));
        }
        if let Some(v) = &media.direction {
            lines.push(format!("a={}", v));
        }
        for rtp in &media.rtp {
            let mut val = format!("{} {}/{}", rtp.payload, rtp.codec, rtp.rate);
            if let Some(encoding) = &rtp.encoding {
                val.push('/');
                val.push_str(encoding);
            }
            lines.push(format!("a=rtpmap:{}", val));
        }
        for fb in &media.rtcp_fb {
            let mut val = format!("{} {}", fb.payload, fb.kind);
            if let Some(subtype) = &fb.subtype {
                val.push(' ');
                val.push_str(subtype);
            }
            lines.push(format!("a=rtcp-fb:{}", val));
        }
        for fmtp in &media.fmtp {
            lines.push(format!("a=fmtp:{} {}", fmtp.payload, fmtp.config));
        }
        for ext in &media.ext {
            lines.push(format!("a=extmap:{} {}", ext.id, ext.uri));
        }
        if media.rtcp_mux {
            lines.push("a=rtcp-mux".to_string());
        }
        if media.rtcp_rsize {
            lines.push("a=rtcp-rsize".to_string());
        }
        for ssrc in &media.ssrcs {
            lines.push(format!(
                "a=ssrc:{} {}:{}",
                ssrc.id, ssrc.attribute, ssrc.value
            ));
        }
        for c in &media.candidates {
            lines.push(format!(
                "a=candidate:{} {} {} {} {} {} typ {}",
                c.foundation, c.component, c.protocol, c.priority, c.ip, c.port, c.kind
            ));
        }
        for (attr, val) in &media.attributes {
            lines.push(attribute_line(attr, val));
        }
    }

    lines.join("\r\n") + "\r\n"
}

fn attribute_line(attr: &str, val: &Option<String>) -> String {
    match val {
        Some(val) => format!("a={}:{}", attr, val),
        None => format!("a={}", attr),
    }
}

fn origin_line(origin: &Origin) -> String {
    format!(
        "o={} {} {} {} IP{} {}",
        origin.username,
        origin.session_id,
        origin.session_version,
        origin.net_type,
        origin.ip_ver,
        origin.address
    )
}
