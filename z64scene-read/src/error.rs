use thiserror::Error;
use z64scene_segment::SegmentError;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}")]
    SegmentError(#[from] SegmentError),

    #[error("read out of range: 0x{offset:06x} + 0x{len:x}, buffer size 0x{size:06x}")]
    OutOfRange { offset: u32, len: u32, size: u32 },
}
