use std::fmt::{self, Debug, Formatter};

use crate::Segment;

/// A segmented address: segment index in the top byte, offset in the low 24 bits.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SegmentAddr(pub u32);

impl Debug for SegmentAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "SegmentAddr({:?}, 0x{:06x})",
            self.segment(),
            self.offset(),
        )
    }
}

impl SegmentAddr {
    pub const NULL: SegmentAddr = SegmentAddr(0);

    pub fn new(segment: Segment, offset: u32) -> Self {
        SegmentAddr(((segment.0 as u32) << 24) | (offset & 0x00ff_ffff))
    }

    pub fn segment(self) -> Segment {
        Segment((self.0 >> 24) as u8)
    }

    pub fn offset(self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn non_null(self) -> Option<SegmentAddr> {
        if self.0 == 0 {
            None
        } else {
            Some(self)
        }
    }

    /// Offsets the address within its segment, failing if the result would leave the segment.
    pub fn checked_add(self, offset: u32) -> Option<SegmentAddr> {
        let sum = self.offset().checked_add(offset)?;
        if sum > 0x00ff_ffff {
            None
        } else {
            Some(SegmentAddr::new(self.segment(), sum))
        }
    }

    pub fn is_aligned(self, align: u32) -> bool {
        self.0 % align == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join() {
        let addr = SegmentAddr(0x0201_2340);
        assert_eq!(addr.segment(), Segment::SCENE);
        assert_eq!(addr.offset(), 0x01_2340);
        assert_eq!(SegmentAddr::new(Segment::SCENE, 0x01_2340), addr);
    }

    #[test]
    fn checked_add_stays_in_segment() {
        assert_eq!(
            SegmentAddr(0x0300_0010).checked_add(8),
            Some(SegmentAddr(0x0300_0018))
        );
        assert_eq!(SegmentAddr(0x03ff_fffc).checked_add(8), None);
    }
}
