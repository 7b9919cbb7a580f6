use std::ops::Range;

use crate::{Segment, SegmentAddr, SegmentError};

/// Maps segment indices to the file buffers that back them.
///
/// A table is built per parse. It borrows the loaded files and never owns them.
#[derive(Clone, Default)]
pub struct SegmentTable<'a> {
    slots: [Option<&'a [u8]>; Segment::COUNT],
}

impl<'a> SegmentTable<'a> {
    pub fn new() -> Self {
        Self {
            slots: [None; Segment::COUNT],
        }
    }

    /// Sets a table entry, replacing any previous mapping.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is greater than 15.
    pub fn set(&mut self, segment: Segment, data: &'a [u8]) {
        self.slots[segment.index()] = Some(data);
    }

    /// Returns a copy of this table with one entry modified.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is greater than 15.
    pub fn with(&self, segment: Segment, data: &'a [u8]) -> Self {
        let mut result = self.clone();
        result.set(segment, data);
        result
    }

    /// Removes a table entry.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is greater than 15.
    pub fn clear(&mut self, segment: Segment) {
        self.slots[segment.index()] = None;
    }

    /// Gets the buffer mapped to a segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested segment is unmapped or out of range.
    pub fn get(&self, segment: Segment) -> Result<&'a [u8], SegmentError> {
        self.slots[segment.validate()?.0 as usize].ok_or(SegmentError::Unmapped(segment))
    }

    pub fn is_mapped(&self, segment: Segment) -> bool {
        self.get(segment).is_ok()
    }

    /// Resolves a segment address to the remainder of its segment's buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is unmapped or the offset lies outside the buffer.
    pub fn resolve(&self, addr: SegmentAddr) -> Result<&'a [u8], SegmentError> {
        let data = self.get(addr.segment())?;
        match data.get(addr.offset() as usize..) {
            Some(rest) if !rest.is_empty() => Ok(rest),
            _ => Err(SegmentError::OutOfRange {
                addr,
                len: 1,
                size: data.len() as u32,
            }),
        }
    }

    /// Resolves `len` bytes starting at a segment address.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is unmapped or any byte lies outside the buffer.
    pub fn resolve_range(&self, addr: SegmentAddr, len: u32) -> Result<&'a [u8], SegmentError> {
        let data = self.get(addr.segment())?;
        let range = byte_range(addr.offset(), len);
        data.get(range).ok_or(SegmentError::OutOfRange {
            addr,
            len,
            size: data.len() as u32,
        })
    }

    /// Tests whether `addr` points at a byte inside a mapped segment.
    pub fn contains(&self, addr: SegmentAddr) -> bool {
        match self.get(addr.segment()) {
            Ok(data) => (addr.offset() as usize) < data.len(),
            Err(_) => false,
        }
    }
}

fn byte_range(offset: u32, len: u32) -> Range<usize> {
    let start = offset as usize;
    start..start + len as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_segment_fails() {
        let table = SegmentTable::new();
        assert!(matches!(
            table.resolve(SegmentAddr(0x0200_0000)),
            Err(SegmentError::Unmapped(Segment::SCENE))
        ));
    }

    #[test]
    fn resolve_respects_bounds() {
        let data = [1u8, 2, 3, 4];
        let table = SegmentTable::new().with(Segment::ROOM, &data);

        assert_eq!(table.resolve(SegmentAddr(0x0300_0002)).unwrap(), &[3, 4]);
        assert_eq!(
            table.resolve_range(SegmentAddr(0x0300_0001), 2).unwrap(),
            &[2, 3]
        );
        assert!(table.resolve_range(SegmentAddr(0x0300_0003), 2).is_err());
        assert!(table.resolve(SegmentAddr(0x0300_0004)).is_err());
        assert!(table.resolve(SegmentAddr(0x0300_0005)).is_err());
        assert!(table.contains(SegmentAddr(0x0300_0003)));
        assert!(!table.contains(SegmentAddr(0x0300_0004)));
    }

    #[test]
    fn set_overwrites() {
        let a = [0u8; 4];
        let b = [0u8; 8];
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &a);
        table.set(Segment::SCENE, &b);
        assert_eq!(table.get(Segment::SCENE).unwrap().len(), 8);
        table.clear(Segment::SCENE);
        assert!(!table.is_mapped(Segment::SCENE));
    }
}
