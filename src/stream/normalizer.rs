//! Per-source message normalization
//!
//! Every source speaks its own wire protocol. A normalizer turns one raw
//! text frame into a [`NormalizedEvent`] or discards it. Normalizers hold no
//! state between frames.

use crate::stream::event::{NormalizedEvent, SourceId};

/// Maps raw frames of one source protocol into normalized events
pub trait MessageNormalizer: Send + Sync {
    /// Source this normalizer parses for
    fn source(&self) -> SourceId;

    /// Parse one raw frame. `None` means the frame carries no event
    /// (subscription ack, unclassified log, malformed payload).
    fn parse(&self, raw: &str) -> Option<NormalizedEvent>;
}

/// Shorten a frame for log output
pub(crate) fn preview(raw: &str) -> &str {
    let mut end = raw.len().min(100);
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}
