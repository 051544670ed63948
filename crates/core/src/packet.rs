//! Multipart packet framing shared by every endpoint.
//!
//! A packet is a multipart message whose first frame carries routing
//! metadata and whose second frame carries the payload. Substream
//! boundaries travel as bracket frames in the routing position.

/// Routing frame opening a substream.
pub const OPEN_BRACKET: &[u8] = b"[";
/// Routing frame closing a substream.
pub const CLOSE_BRACKET: &[u8] = b"]";

/// Routing frame used for packets this component originates.
const DEFAULT_ROUTING_FRAME: &[u8] = b"p";

/// Returns true when `frames` form a well-formed addressed packet: a
/// non-empty routing frame followed by at least one payload frame.
pub fn is_valid(frames: &[Vec<u8>]) -> bool {
    frames.len() >= 2 && !frames[0].is_empty()
}

/// Returns true when an addressed packet carries data rather than a
/// substream bracket.
pub fn is_data(frames: &[Vec<u8>]) -> bool {
    frames
        .first()
        .is_some_and(|routing| routing.as_slice() != OPEN_BRACKET && routing.as_slice() != CLOSE_BRACKET)
}

/// Wraps `payload` into an addressed data packet.
pub fn new(payload: &[u8]) -> Vec<Vec<u8>> {
    vec![DEFAULT_ROUTING_FRAME.to_vec(), payload.to_vec()]
}
