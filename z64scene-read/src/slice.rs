use std::marker::PhantomData;
use z64scene_segment::{SegmentAddr, SegmentTable};

use crate::{read_at, FromData, Layout, ReadError};

/// A counted array of records behind a segment address.
pub struct Slice<T> {
    addr: SegmentAddr,
    len: u32,
    _phantom_t: PhantomData<fn() -> T>,
}

impl<T> Clone for Slice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slice<T> {}

impl<T> Slice<T>
where
    T: FromData + Layout,
{
    pub fn new(addr: SegmentAddr, len: u32) -> Self {
        Self {
            addr,
            len,
            _phantom_t: PhantomData,
        }
    }

    pub fn len(self) -> u32 {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Address of element `index`, or `None` if it would leave the segment.
    fn element_addr(self, index: u32) -> Option<SegmentAddr> {
        self.addr.checked_add(index.checked_mul(T::SIZE)?)
    }

    pub fn get(self, segment_table: &SegmentTable<'_>, index: u32) -> Result<T, ReadError> {
        match self.element_addr(index) {
            Some(addr) => read_at(segment_table, addr),
            None => Err(ReadError::OutOfRange {
                offset: self.addr.offset(),
                len: self.len.saturating_mul(T::SIZE),
                size: 0x0100_0000,
            }),
        }
    }

    /// Reads every element, failing on the first one that is out of range.
    pub fn read_all(self, segment_table: &SegmentTable<'_>) -> Result<Vec<T>, ReadError> {
        (0..self.len).map(|i| self.get(segment_table, i)).collect()
    }
}
