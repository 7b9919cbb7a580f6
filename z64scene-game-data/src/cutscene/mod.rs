//! Cutscene command streams, in the OoT and MM dialects.
//!
//! Both dialects start with a `u32` command count and a `u32` frame count, followed by one
//! record list per command. Every record list starts with a `u32` command type, usually followed
//! by a `u32` entry count.

use thiserror::Error;
use z64scene_read::{Cursor, ReadError};
use z64scene_segment::SegmentError;
use z64scene_write::WriteContext;

pub mod mm;
pub mod oot;

pub use mm::{BodyMm, CommandMm, CutsceneListMm, CutsceneMm};
pub use oot::{BodyOot, CameraCue, CameraPoint, CommandOot, CutsceneOot};

/// Command type that ends a stream before its declared command count.
pub const CS_STOP: u32 = 0xffff_ffff;

/// Size of an actor or player cue record in both dialects.
pub const ACTOR_CUE_SIZE: u32 = 0x30;

#[derive(Debug, Error)]
pub enum CutsceneError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("{0}")]
    SegmentError(#[from] SegmentError),

    #[error("unknown cutscene command 0x{kind:08x} at offset 0x{offset:x}")]
    UnknownCommand { kind: u32, offset: u32 },

    #[error("cutscene command 0x{kind:08x} claims {count} entries")]
    BadEntryCount { kind: u32, count: i32 },
}

/// A fixed-shape record. Record sizes vary by dialect and command, so they are passed to
/// [`read_records`] and [`write_records`] rather than being part of the type.
pub trait Record: Sized {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError>;
    fn write(&self, ctx: &mut WriteContext);
}

/// Reads `count` records of `size` bytes each. Bytes past the record's fields are skipped.
pub fn read_records<T: Record>(
    c: &mut Cursor<'_>,
    count: u32,
    size: u32,
) -> Result<Vec<T>, ReadError> {
    (0..count)
        .map(|_| -> Result<T, ReadError> { T::read(&mut Cursor::new(c.bytes(size)?, 0)) })
        .collect()
}

/// Writes records, zero-padding each one to `size` bytes.
pub fn write_records<T: Record>(ctx: &mut WriteContext, records: &[T], size: u32) {
    for record in records {
        ctx.put_exactly_size(size);
        record.write(ctx);
        ctx.end_exactly_size();
    }
}

/// The common record shape: one parameter and a frame range.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct FrameCue {
    /// The command's parameter: a misc type, transition type, sequence player or destination.
    pub value: u16,
    pub start_frame: u16,
    pub end_frame: u16,
}

impl Record for FrameCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            value: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.value);
        ctx.put16(self.start_frame);
        ctx.put16(self.end_frame);
    }
}

/// OoT light setting and sequence records, whose parameter is a single byte.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ByteCue {
    pub unused0: u8,
    /// Light setting or sequence id, plus one.
    pub value_plus_one: u8,
    pub start_frame: u16,
    pub end_frame: u16,
}

impl Record for ByteCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            unused0: c.read()?,
            value_plus_one: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put8(self.unused0);
        ctx.put8(self.value_plus_one);
        ctx.put16(self.start_frame);
        ctx.put16(self.end_frame);
    }
}

/// Moves an actor (or the player) from one position to another over a frame range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActorCue {
    pub id: u16,
    pub start_frame: u16,
    pub end_frame: u16,
    pub rot: [u16; 3],
    pub start_pos: [i32; 3],
    pub end_pos: [i32; 3],
    pub normal: [f32; 3],
}

impl Record for ActorCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            id: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
            rot: [c.read()?, c.read()?, c.read()?],
            start_pos: [c.read()?, c.read()?, c.read()?],
            end_pos: [c.read()?, c.read()?, c.read()?],
            normal: [c.read()?, c.read()?, c.read()?],
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.id);
        ctx.put16(self.start_frame);
        ctx.put16(self.end_frame);
        for &v in &self.rot {
            ctx.put16(v);
        }
        for &v in self.start_pos.iter().chain(&self.end_pos) {
            ctx.put32(v as u32);
        }
        for &v in &self.normal {
            ctx.put32(v.to_bits());
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct TextCue {
    /// Message id, or an ocarina action for ocarina text types.
    pub text_id: u16,
    pub start_frame: u16,
    pub end_frame: u16,
    pub type_: u16,
    pub alt_text_id1: u16,
    pub alt_text_id2: u16,
}

impl Record for TextCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            text_id: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
            type_: c.read()?,
            alt_text_id1: c.read()?,
            alt_text_id2: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        for &v in &[
            self.text_id,
            self.start_frame,
            self.end_frame,
            self.type_,
            self.alt_text_id1,
            self.alt_text_id2,
        ] {
            ctx.put16(v);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct TimeCue {
    pub unused0: u16,
    pub start_frame: u16,
    pub end_frame: u16,
    pub hour: u8,
    pub minute: u8,
}

impl Record for TimeCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            unused0: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
            hour: c.read()?,
            minute: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.unused0);
        ctx.put16(self.start_frame);
        ctx.put16(self.end_frame);
        ctx.put8(self.hour);
        ctx.put8(self.minute);
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RumbleCue {
    /// Unused in OoT, the rumble type in MM.
    pub value: u16,
    pub start_frame: u16,
    pub end_frame: u16,
    pub intensity: u8,
    pub duration: u8,
    pub decay: u8,
}

impl Record for RumbleCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            value: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
            intensity: c.read()?,
            duration: c.read()?,
            decay: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.value);
        ctx.put16(self.start_frame);
        ctx.put16(self.end_frame);
        ctx.put8(self.intensity);
        ctx.put8(self.duration);
        ctx.put8(self.decay);
    }
}

/// MM screen transition with a fill colour.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ColorCue {
    pub type_: u16,
    pub start_frame: u16,
    pub end_frame: u16,
    pub color: [u8; 3],
}

impl Record for ColorCue {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            type_: c.read()?,
            start_frame: c.read()?,
            end_frame: c.read()?,
            color: [c.read()?, c.read()?, c.read()?],
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.type_);
        ctx.put16(self.start_frame);
        ctx.put16(self.end_frame);
        ctx.put_bytes(&self.color);
    }
}

/// Record bytes for a command whose fields are not decoded.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RawRecord(pub Vec<u8>);

impl RawRecord {
    fn read_list(c: &mut Cursor<'_>, count: u32, size: u32) -> Result<Vec<RawRecord>, ReadError> {
        (0..count)
            .map(|_| -> Result<_, ReadError> { Ok(RawRecord(c.bytes(size)?.to_vec())) })
            .collect()
    }

    fn write_list(ctx: &mut WriteContext, records: &[RawRecord], size: u32) {
        for record in records {
            ctx.put_exactly_size(size);
            ctx.put_bytes(&record.0);
            ctx.end_exactly_size();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z64scene_segment::Segment;

    #[test]
    fn records_are_padded_to_size() {
        let cues = vec![
            TimeCue {
                unused0: 1,
                start_frame: 2,
                end_frame: 3,
                hour: 6,
                minute: 30,
            },
            TimeCue::default(),
        ];
        let mut ctx = WriteContext::new(Segment::SCENE);
        ctx.push(4);
        write_records(&mut ctx, &cues, 0xc);
        assert_eq!(ctx.len(), 0x18);
        ctx.pop();
        let out = ctx.finish();

        let mut c = Cursor::new(&out, 0);
        assert_eq!(read_records::<TimeCue>(&mut c, 2, 0xc).unwrap(), cues);
        assert_eq!(c.offset(), 0x18);
    }

    #[test]
    fn truncated_record_is_an_error() {
        let data = [0u8; 0x2f];
        let mut c = Cursor::new(&data, 0);
        assert!(read_records::<ActorCue>(&mut c, 1, ACTOR_CUE_SIZE).is_err());
    }
}
