use thiserror::Error;

use crate::{Segment, SegmentAddr};

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("segment out of range: {0:?}")]
    BadSegment(Segment),

    #[error("unmapped segment: {0:?}")]
    Unmapped(Segment),

    #[error("segment access out of range: {addr:?} + 0x{len:x}, segment size 0x{size:06x}")]
    OutOfRange {
        addr: SegmentAddr,
        len: u32,
        size: u32,
    },
}
