use std::fmt::{self, Debug, Formatter};

use crate::SegmentError;

/// One of the 16 segment registers an address can name in its top byte.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Segment(pub u8);

impl Segment {
    pub const SCENE: Segment = Segment(0x02);
    pub const ROOM: Segment = Segment(0x03);
    pub const GAMEPLAY_KEEP: Segment = Segment(0x04);
    pub const FIELD_DANGEON_KEEP: Segment = Segment(0x05);
    pub const OBJECT: Segment = Segment(0x06);

    pub const COUNT: usize = 16;

    pub fn validate(self) -> Result<Self, SegmentError> {
        if usize::from(self.0) < Self::COUNT {
            Ok(self)
        } else {
            Err(SegmentError::BadSegment(self))
        }
    }

    /// Slot of this segment in a per-segment array.
    ///
    /// # Panics
    ///
    /// Panics if the segment is greater than 15.
    pub fn index(self) -> usize {
        match self.validate() {
            Ok(segment) => usize::from(segment.0),
            Err(e) => panic!("{}", e),
        }
    }

    /// The name the engine gives this segment, if it has a fixed role.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Segment::SCENE => Some("CurrentScene"),
            Segment::ROOM => Some("CurrentRoom"),
            Segment::GAMEPLAY_KEEP => Some("GameplayKeep"),
            Segment::FIELD_DANGEON_KEEP => Some("FieldDangeonKeep"),
            Segment::OBJECT => Some("CurrentObject"),
            _ => None,
        }
    }
}

impl Debug for Segment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Segment(0x{:02x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_low_sixteen_are_valid() {
        assert_eq!(Segment(0x0f).index(), 15);
        assert!(Segment(0x10).validate().is_err());
        assert_eq!(format!("{:?}", Segment::ROOM), "CurrentRoom");
        assert_eq!(format!("{:?}", Segment(0x0d)), "Segment(0x0d)");
    }

    #[test]
    #[should_panic]
    fn index_of_bad_segment_panics() {
        Segment(0x20).index();
    }
}
