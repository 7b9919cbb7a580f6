use thiserror::Error;
use z64scene_read::ReadError;
use z64scene_segment::{SegmentAddr, SegmentError};

#[derive(Debug, Error)]
pub enum DataBlobError {
    #[error("{0}")]
    SegmentError(#[from] SegmentError),

    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("blob {addr:?} is 0x{size:x} bytes, beyond the 24-bit addressable range")]
    Oversized { addr: SegmentAddr, size: u32 },
}
