use z64scene_segment::SegmentAddr;

/// Records with a fixed size in the file. Arrays of them are packed back to back.
pub trait Layout {
    const SIZE: u32;
}

macro_rules! sized {
    ($($t:ty => $size:expr),* $(,)?) => {
        $(impl Layout for $t {
            const SIZE: u32 = $size;
        })*
    };
}

sized! {
    bool => 1,
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    f32 => 4,
    SegmentAddr => 4,
    [i16; 3] => 6,
}
