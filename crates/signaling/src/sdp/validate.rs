//! Answer sanity check

use tracing::warn;

/// Whether an answer SDP is structurally usable by a browser peer:
/// the `v=`/`o=`/`s=`/`t=` session lines are present and at least two
/// media sections exist (audio and video).
pub fn is_answer_usable(sdp: &str) -> bool {
    let mut has_v = false;
    let mut has_o = false;
    let mut has_s = false;
    let mut has_t = false;
    let mut media = 0usize;

    for line in sdp.lines() {
        match line.split_once('=').map(|(t, _)| t) {
            Some("v") => has_v = true,
            Some("o") => has_o = true,
            Some("s") => has_s = true,
            Some("t") => has_t = true,
            Some("m") => media += 1,
            _ => {}
        }
    }

    let usable = has_v && has_o && has_s && has_t && media >= 2;
    if !usable {
        warn!(
            has_v, has_o, has_s, has_t, media,
            "answer failed structural check"
        );
    }
    usable
}
