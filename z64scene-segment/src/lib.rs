//! Segmented addressing: 32-bit addresses whose top byte picks one of 16 segment registers.

mod addr;
mod error;
mod segment;
mod table;

pub use addr::SegmentAddr;
pub use error::SegmentError;
pub use segment::Segment;
pub use table::SegmentTable;
