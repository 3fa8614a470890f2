//! Minimal SDP codec
//!
//! Parses the subset of SDP the relay negotiation touches and writes
//! answers back in the fixed line order the vendor gateway produces.
//! Unrecognized attributes are carried through an ordered bag so a
//! parse/write cycle never silently drops them.

mod model;
mod parser;
mod validate;
mod writer;

pub use model::{
    CandidateLine, ExtMapLine, FingerprintLine, FmtpLine, Group, MediaSection, MsidSemantic,
    Origin, RtcpFbLine, RtpMapLine, SdpDocument, SsrcLine,
};
pub use parser::parse;
pub use validate::is_answer_usable;
pub use writer::write;
