//! The OoT cutscene dialect.

use std::borrow::Cow;
use z64scene_read::{Cursor, ReadError};
use z64scene_segment::{SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

use super::{
    read_records, write_records, ActorCue, ByteCue, CutsceneError, FrameCue, RawRecord, Record,
    RumbleCue, TextCue, TimeCue, ACTOR_CUE_SIZE, CS_STOP,
};

pub const CAM_EYE_SPLINE: u32 = 0x01;
pub const CAM_AT_SPLINE: u32 = 0x02;
pub const MISC: u32 = 0x03;
pub const LIGHT_SETTING: u32 = 0x04;
pub const CAM_EYE_SPLINE_REL_TO_PLAYER: u32 = 0x05;
pub const CAM_AT_SPLINE_REL_TO_PLAYER: u32 = 0x06;
pub const CAM_EYE: u32 = 0x07;
pub const CAM_AT: u32 = 0x08;
pub const RUMBLE_CONTROLLER: u32 = 0x09;
pub const PLAYER_CUE: u32 = 0x0a;
pub const TEXT: u32 = 0x13;
pub const TRANSITION: u32 = 0x2d;
pub const START_SEQ: u32 = 0x56;
pub const STOP_SEQ: u32 = 0x57;
pub const FADE_OUT_SEQ: u32 = 0x7c;
pub const TIME: u32 = 0x8c;
pub const DESTINATION: u32 = 0x3e8;

/// Misc, light, sequence and undecoded records.
const LONG_RECORD_SIZE: u32 = 0x30;
/// Rumble, time and text records.
const SHORT_RECORD_SIZE: u32 = 0xc;
/// Destination and transition records.
const SINGLE_RECORD_SIZE: u32 = 8;
const CAMERA_HEADER_SIZE: u32 = 8;
const CAMERA_POINT_SIZE: u32 = 0x10;

/// Highest entry count accepted before the data is assumed not to be a cutscene.
const MAX_ENTRIES: i32 = 255;

/// Every command type the game defines, sorted.
const COMMAND_NAMES: &[(u32, &str)] = &[
    (0x0001, "CAM_EYE_SPLINE"),
    (0x0002, "CAM_AT_SPLINE"),
    (0x0003, "MISC"),
    (0x0004, "LIGHT_SETTING"),
    (0x0005, "CAM_EYE_SPLINE_REL_TO_PLAYER"),
    (0x0006, "CAM_AT_SPLINE_REL_TO_PLAYER"),
    (0x0007, "CAM_EYE"),
    (0x0008, "CAM_AT"),
    (0x0009, "RUMBLE_CONTROLLER"),
    (0x000a, "PLAYER_CUE"),
    (0x000b, "UNIMPLEMENTED_B"),
    (0x000d, "UNIMPLEMENTED_D"),
    (0x000e, "ACTOR_CUE_1_0"),
    (0x000f, "ACTOR_CUE_0_0"),
    (0x0010, "ACTOR_CUE_1_1"),
    (0x0011, "ACTOR_CUE_0_1"),
    (0x0012, "ACTOR_CUE_0_2"),
    (0x0013, "TEXT"),
    (0x0015, "UNIMPLEMENTED_15"),
    (0x0016, "UNIMPLEMENTED_16"),
    (0x0017, "ACTOR_CUE_0_3"),
    (0x0018, "ACTOR_CUE_1_2"),
    (0x0019, "ACTOR_CUE_2_0"),
    (0x001a, "UNIMPLEMENTED_1A"),
    (0x001b, "UNIMPLEMENTED_1B"),
    (0x001c, "UNIMPLEMENTED_1C"),
    (0x001d, "ACTOR_CUE_3_0"),
    (0x001e, "ACTOR_CUE_4_0"),
    (0x001f, "ACTOR_CUE_6_0"),
    (0x0020, "UNIMPLEMENTED_20"),
    (0x0021, "UNIMPLEMENTED_21"),
    (0x0022, "ACTOR_CUE_0_4"),
    (0x0023, "ACTOR_CUE_1_3"),
    (0x0024, "ACTOR_CUE_2_1"),
    (0x0025, "ACTOR_CUE_3_1"),
    (0x0026, "ACTOR_CUE_4_1"),
    (0x0027, "ACTOR_CUE_0_5"),
    (0x0028, "ACTOR_CUE_1_4"),
    (0x0029, "ACTOR_CUE_2_2"),
    (0x002a, "ACTOR_CUE_3_2"),
    (0x002b, "ACTOR_CUE_4_2"),
    (0x002c, "ACTOR_CUE_5_0"),
    (0x002d, "TRANSITION"),
    (0x002e, "ACTOR_CUE_0_6"),
    (0x002f, "ACTOR_CUE_4_3"),
    (0x0030, "ACTOR_CUE_1_5"),
    (0x0031, "ACTOR_CUE_7_0"),
    (0x0032, "ACTOR_CUE_2_3"),
    (0x0033, "ACTOR_CUE_3_3"),
    (0x0034, "ACTOR_CUE_6_1"),
    (0x0035, "ACTOR_CUE_3_4"),
    (0x0036, "ACTOR_CUE_4_4"),
    (0x0037, "ACTOR_CUE_5_1"),
    (0x0039, "ACTOR_CUE_6_2"),
    (0x003a, "ACTOR_CUE_6_3"),
    (0x003b, "UNIMPLEMENTED_3B"),
    (0x003c, "ACTOR_CUE_7_1"),
    (0x003d, "UNIMPLEMENTED_3D"),
    (0x003e, "ACTOR_CUE_8_0"),
    (0x003f, "ACTOR_CUE_3_5"),
    (0x0040, "ACTOR_CUE_1_6"),
    (0x0041, "ACTOR_CUE_3_6"),
    (0x0042, "ACTOR_CUE_3_7"),
    (0x0043, "ACTOR_CUE_2_4"),
    (0x0044, "ACTOR_CUE_1_7"),
    (0x0045, "ACTOR_CUE_2_5"),
    (0x0046, "ACTOR_CUE_1_8"),
    (0x0047, "UNIMPLEMENTED_47"),
    (0x0048, "ACTOR_CUE_2_6"),
    (0x0049, "UNIMPLEMENTED_49"),
    (0x004a, "ACTOR_CUE_2_7"),
    (0x004b, "ACTOR_CUE_3_8"),
    (0x004c, "ACTOR_CUE_0_7"),
    (0x004d, "ACTOR_CUE_5_2"),
    (0x004e, "ACTOR_CUE_1_9"),
    (0x004f, "ACTOR_CUE_4_5"),
    (0x0050, "ACTOR_CUE_1_10"),
    (0x0051, "ACTOR_CUE_2_8"),
    (0x0052, "ACTOR_CUE_3_9"),
    (0x0053, "ACTOR_CUE_4_6"),
    (0x0054, "ACTOR_CUE_5_3"),
    (0x0055, "ACTOR_CUE_0_8"),
    (0x0056, "START_SEQ"),
    (0x0057, "STOP_SEQ"),
    (0x0058, "ACTOR_CUE_6_4"),
    (0x0059, "ACTOR_CUE_7_2"),
    (0x005a, "ACTOR_CUE_5_4"),
    (0x005d, "ACTOR_CUE_0_9"),
    (0x005e, "ACTOR_CUE_1_11"),
    (0x0069, "ACTOR_CUE_0_10"),
    (0x006a, "ACTOR_CUE_2_9"),
    (0x006b, "ACTOR_CUE_0_11"),
    (0x006c, "ACTOR_CUE_3_10"),
    (0x006d, "UNIMPLEMENTED_6D"),
    (0x006e, "ACTOR_CUE_0_12"),
    (0x006f, "ACTOR_CUE_7_3"),
    (0x0070, "UNIMPLEMENTED_70"),
    (0x0071, "UNIMPLEMENTED_71"),
    (0x0072, "ACTOR_CUE_7_4"),
    (0x0073, "ACTOR_CUE_6_5"),
    (0x0074, "ACTOR_CUE_1_12"),
    (0x0075, "ACTOR_CUE_2_10"),
    (0x0076, "ACTOR_CUE_1_13"),
    (0x0077, "ACTOR_CUE_0_13"),
    (0x0078, "ACTOR_CUE_1_14"),
    (0x0079, "ACTOR_CUE_2_11"),
    (0x007b, "ACTOR_CUE_0_14"),
    (0x007c, "FADE_OUT_SEQ"),
    (0x007d, "ACTOR_CUE_1_15"),
    (0x007e, "ACTOR_CUE_2_12"),
    (0x007f, "ACTOR_CUE_3_11"),
    (0x0080, "ACTOR_CUE_4_7"),
    (0x0081, "ACTOR_CUE_5_5"),
    (0x0082, "ACTOR_CUE_6_6"),
    (0x0083, "ACTOR_CUE_1_16"),
    (0x0084, "ACTOR_CUE_2_13"),
    (0x0085, "ACTOR_CUE_3_12"),
    (0x0086, "ACTOR_CUE_7_5"),
    (0x0087, "ACTOR_CUE_4_8"),
    (0x0088, "ACTOR_CUE_5_6"),
    (0x0089, "ACTOR_CUE_6_7"),
    (0x008a, "ACTOR_CUE_0_15"),
    (0x008b, "ACTOR_CUE_0_16"),
    (0x008c, "TIME"),
    (0x008d, "ACTOR_CUE_1_17"),
    (0x008e, "ACTOR_CUE_7_6"),
    (0x008f, "ACTOR_CUE_9_0"),
    (0x0090, "ACTOR_CUE_0_17"),
    (0x03e8, "DESTINATION"),
    (0xffff, "END"),
];

/// Symbolic name of a command type, or `None` if the game does not define it.
pub fn command_name(kind: u32) -> Option<&'static str> {
    if kind == CS_STOP {
        return Some("CAM_STOP");
    }
    COMMAND_NAMES
        .binary_search_by_key(&kind, |&(k, _)| k)
        .ok()
        .map(|index| COMMAND_NAMES[index].1)
}

/// Camera commands carry no entry count.
pub fn is_camera(kind: u32) -> bool {
    matches!(
        kind,
        CAM_EYE_SPLINE
            | CAM_AT_SPLINE
            | CAM_EYE_SPLINE_REL_TO_PLAYER
            | CAM_AT_SPLINE_REL_TO_PLAYER
            | CAM_EYE
            | CAM_AT
    )
}

pub fn is_actor_cue(kind: u32) -> bool {
    kind == PLAYER_CUE || command_name(kind).map_or(false, |name| name.starts_with("ACTOR_CUE"))
}

/// Marks the last point of a camera spline.
pub const CS_CAM_STOP: i8 = -1;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraPoint {
    pub continue_flag: i8,
    pub roll: i8,
    pub next_point_frame: u16,
    /// Field of view in degrees.
    pub view_angle: f32,
    pub pos: [i16; 3],
}

impl Record for CameraPoint {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            continue_flag: c.read()?,
            roll: c.read()?,
            next_point_frame: c.read()?,
            view_angle: c.read()?,
            pos: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put8(self.continue_flag as u8);
        ctx.put8(self.roll as u8);
        ctx.put16(self.next_point_frame);
        ctx.put32(self.view_angle.to_bits());
        for &v in &self.pos {
            ctx.put16(v as u16);
        }
    }
}

/// An eye or look-at camera track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraCue {
    pub unused0: u16,
    pub start_frame: u16,
    pub end_frame: u16,
    pub points: Vec<CameraPoint>,
}

impl CameraCue {
    /// Reads the header and points. `CAM_EYE` and `CAM_AT` hold exactly one point; splines run
    /// through the first point flagged [`CS_CAM_STOP`].
    fn read(c: &mut Cursor<'_>, kind: u32) -> Result<Self, ReadError> {
        let header = FrameCue::read(&mut Cursor::new(c.bytes(CAMERA_HEADER_SIZE)?, 0))?;
        let mut points = vec![];
        loop {
            let point = CameraPoint::read(&mut Cursor::new(c.bytes(CAMERA_POINT_SIZE)?, 0))?;
            points.push(point);
            if point.continue_flag == CS_CAM_STOP || kind == CAM_EYE || kind == CAM_AT {
                break;
            }
        }
        Ok(Self {
            unused0: header.value,
            start_frame: header.start_frame,
            end_frame: header.end_frame,
            points,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        write_records(
            ctx,
            &[FrameCue {
                value: self.unused0,
                start_frame: self.start_frame,
                end_frame: self.end_frame,
            }],
            CAMERA_HEADER_SIZE,
        );
        write_records(ctx, &self.points, CAMERA_POINT_SIZE);
    }
}

/// The records of one command. The variant must agree with the command's type.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyOot {
    /// Ends the stream.
    Stop,
    Camera(CameraCue),
    ActorCue(Vec<ActorCue>),
    Misc(Vec<FrameCue>),
    LightSetting(Vec<ByteCue>),
    StartSeq(Vec<ByteCue>),
    StopSeq(Vec<ByteCue>),
    FadeOutSeq(Vec<FrameCue>),
    Rumble(Vec<RumbleCue>),
    Time(Vec<TimeCue>),
    Text(Vec<TextCue>),
    Destination(FrameCue),
    Transition(FrameCue),
    /// A defined command whose records are not decoded.
    Unimplemented(Vec<RawRecord>),
}

impl BodyOot {
    /// Number of records, as stored in the entry count field.
    pub fn entry_count(&self) -> u32 {
        let len = match self {
            BodyOot::Stop => 0,
            BodyOot::Camera(_) | BodyOot::Destination(_) | BodyOot::Transition(_) => 1,
            BodyOot::ActorCue(v) => v.len(),
            BodyOot::Misc(v) | BodyOot::FadeOutSeq(v) => v.len(),
            BodyOot::LightSetting(v) | BodyOot::StartSeq(v) | BodyOot::StopSeq(v) => v.len(),
            BodyOot::Rumble(v) => v.len(),
            BodyOot::Time(v) => v.len(),
            BodyOot::Text(v) => v.len(),
            BodyOot::Unimplemented(v) => v.len(),
        };
        len as u32
    }

    fn read(c: &mut Cursor<'_>, kind: u32, count: u32, offset: u32) -> Result<Self, CutsceneError> {
        if is_actor_cue(kind) {
            return Ok(BodyOot::ActorCue(read_records(c, count, ACTOR_CUE_SIZE)?));
        }
        Ok(match kind {
            CS_STOP => BodyOot::Stop,
            MISC => BodyOot::Misc(read_records(c, count, LONG_RECORD_SIZE)?),
            LIGHT_SETTING => BodyOot::LightSetting(read_records(c, count, LONG_RECORD_SIZE)?),
            START_SEQ => BodyOot::StartSeq(read_records(c, count, LONG_RECORD_SIZE)?),
            STOP_SEQ => BodyOot::StopSeq(read_records(c, count, LONG_RECORD_SIZE)?),
            FADE_OUT_SEQ => BodyOot::FadeOutSeq(read_records(c, count, LONG_RECORD_SIZE)?),
            RUMBLE_CONTROLLER => BodyOot::Rumble(read_records(c, count, SHORT_RECORD_SIZE)?),
            TIME => BodyOot::Time(read_records(c, count, SHORT_RECORD_SIZE)?),
            TEXT => BodyOot::Text(read_records(c, count, SHORT_RECORD_SIZE)?),
            // The entry count of these two is ignored by the game: there is always one record.
            DESTINATION => BodyOot::Destination(read_records(c, 1, SINGLE_RECORD_SIZE)?.remove(0)),
            TRANSITION => BodyOot::Transition(read_records(c, 1, SINGLE_RECORD_SIZE)?.remove(0)),
            _ if is_camera(kind) => BodyOot::Camera(CameraCue::read(c, kind)?),
            _ => match command_name(kind) {
                Some(name) => {
                    log::debug!("keeping {} undecoded", name);
                    BodyOot::Unimplemented(RawRecord::read_list(c, count, LONG_RECORD_SIZE)?)
                }
                None => return Err(CutsceneError::UnknownCommand { kind, offset }),
            },
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        match self {
            BodyOot::Stop => (),
            BodyOot::Camera(camera) => camera.write(ctx),
            BodyOot::ActorCue(v) => write_records(ctx, v, ACTOR_CUE_SIZE),
            BodyOot::Misc(v) | BodyOot::FadeOutSeq(v) => write_records(ctx, v, LONG_RECORD_SIZE),
            BodyOot::LightSetting(v) | BodyOot::StartSeq(v) | BodyOot::StopSeq(v) => {
                write_records(ctx, v, LONG_RECORD_SIZE)
            }
            BodyOot::Rumble(v) => write_records(ctx, v, SHORT_RECORD_SIZE),
            BodyOot::Time(v) => write_records(ctx, v, SHORT_RECORD_SIZE),
            BodyOot::Text(v) => write_records(ctx, v, SHORT_RECORD_SIZE),
            BodyOot::Destination(cue) | BodyOot::Transition(cue) => {
                write_records(ctx, &[*cue], SINGLE_RECORD_SIZE)
            }
            BodyOot::Unimplemented(v) => RawRecord::write_list(ctx, v, LONG_RECORD_SIZE),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandOot {
    pub kind: u32,
    pub body: BodyOot,
}

impl CommandOot {
    pub fn name(&self) -> Cow<'static, str> {
        match command_name(self.kind) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("0x{:08x}", self.kind)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CutsceneOot {
    pub frame_count: i32,
    pub commands: Vec<CommandOot>,
}

impl CutsceneOot {
    /// Decodes the cutscene at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the stream runs off the end of `data`, a command has more than 255 entries, or a
    /// command type is not one the game defines. Any of these means the data is probably not a
    /// cutscene.
    pub fn parse(data: &[u8], offset: u32) -> Result<CutsceneOot, CutsceneError> {
        let mut c = Cursor::new(data, offset);
        let total: i32 = c.read()?;
        let frame_count: i32 = c.read()?;
        let mut commands = vec![];
        for _ in 0..total.max(0) {
            let at = c.offset();
            let kind: u32 = c.read()?;
            let count: i32 = if is_camera(kind) { 0 } else { c.read()? };
            if !(0..=MAX_ENTRIES).contains(&count) {
                return Err(CutsceneError::BadEntryCount { kind, count });
            }
            let body = BodyOot::read(&mut c, kind, count as u32, at)?;
            let stop = body == BodyOot::Stop;
            let command = CommandOot { kind, body };
            log::trace!("0x{:06x}: {} x{}", at, command.name(), count);
            commands.push(command);
            if stop {
                break;
            }
        }
        Ok(CutsceneOot {
            frame_count,
            commands,
        })
    }

    pub fn parse_at(
        segment_table: &SegmentTable<'_>,
        addr: SegmentAddr,
    ) -> Result<CutsceneOot, CutsceneError> {
        Self::parse(segment_table.get(addr.segment())?, addr.offset())
    }

    /// Encodes the cutscene. Entry counts are taken from the record lists, and nothing after a
    /// stop command is written.
    pub fn write(&self, ctx: &mut WriteContext) -> SegmentAddr {
        ctx.push(4);
        ctx.put32(self.commands.len() as u32);
        ctx.put32(self.frame_count as u32);
        for command in &self.commands {
            ctx.put32(command.kind);
            if !is_camera(command.kind) {
                ctx.put32(command.body.entry_count());
            }
            command.body.write(ctx);
            if command.body == BodyOot::Stop {
                break;
            }
        }
        ctx.pop()
    }
}
