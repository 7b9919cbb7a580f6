//! The MM cutscene dialect. Every command carries an entry count, including camera splines, whose
//! count is a byte length.

use std::borrow::Cow;
use z64scene_read::Cursor;
use z64scene_segment::{SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

use super::{
    read_records, write_records, ActorCue, ColorCue, CutsceneError, FrameCue, RawRecord,
    RumbleCue, TextCue, TimeCue, ACTOR_CUE_SIZE, CS_STOP,
};

pub const TEXT: u32 = 10;
pub const CAMERA_SPLINE: u32 = 90;
pub const MISC: u32 = 0x96;
pub const LIGHT_SETTING: u32 = 0x97;
pub const TRANSITION: u32 = 0x98;
pub const MOTION_BLUR: u32 = 0x99;
pub const GIVE_TATL: u32 = 0x9a;
pub const TRANSITION_GENERAL: u32 = 0x9b;
pub const FADE_OUT_SEQ: u32 = 0x9c;
pub const TIME: u32 = 0x9d;
pub const PLAYER_CUE: u32 = 200;
pub const START_SEQ: u32 = 300;
pub const STOP_SEQ: u32 = 301;
pub const START_AMBIENCE: u32 = 302;
pub const FADE_OUT_AMBIENCE: u32 = 303;
pub const SFX_REVERB_INDEX_2: u32 = 304;
pub const SFX_REVERB_INDEX_1: u32 = 305;
pub const MODIFY_SEQ: u32 = 306;
pub const DESTINATION: u32 = 350;
pub const CHOOSE_CREDITS_SCENES: u32 = 351;
pub const RUMBLE: u32 = 400;
pub const ACTOR_CUE_POST_PROCESS: u32 = 0xffff_fffe;

const RECORD_SIZE: u32 = 8;
const LONG_RECORD_SIZE: u32 = 0xc;
const LIST_ENTRY_SIZE: u32 = 8;

pub fn is_actor_cue(kind: u32) -> bool {
    matches!(kind, 100..=149 | 201 | 450..=599) || kind == PLAYER_CUE
}

/// Symbolic name of a command type, or `None` if the game does not define it.
pub fn command_name(kind: u32) -> Option<Cow<'static, str>> {
    let name = match kind {
        CS_STOP => "CAM_STOP",
        TEXT => "TEXT",
        CAMERA_SPLINE => "CAMERA_SPLINE",
        MISC => "MISC",
        LIGHT_SETTING => "LIGHT_SETTING",
        TRANSITION => "TRANSITION",
        MOTION_BLUR => "MOTION_BLUR",
        GIVE_TATL => "GIVE_TATL",
        TRANSITION_GENERAL => "TRANSITION_GENERAL",
        FADE_OUT_SEQ => "FADE_OUT_SEQ",
        TIME => "TIME",
        PLAYER_CUE => "PLAYER_CUE",
        START_SEQ => "START_SEQ",
        STOP_SEQ => "STOP_SEQ",
        START_AMBIENCE => "START_AMBIENCE",
        FADE_OUT_AMBIENCE => "FADE_OUT_AMBIENCE",
        SFX_REVERB_INDEX_2 => "SFX_REVERB_INDEX_2",
        SFX_REVERB_INDEX_1 => "SFX_REVERB_INDEX_1",
        MODIFY_SEQ => "MODIFY_SEQ",
        DESTINATION => "DESTINATION",
        CHOOSE_CREDITS_SCENES => "CHOOSE_CREDITS_SCENES",
        RUMBLE => "RUMBLE",
        ACTOR_CUE_POST_PROCESS => "ACTOR_CUE_POST_PROCESS",
        _ if is_actor_cue(kind) => return Some(Cow::Owned(format!("ACTOR_CUE_{}", kind))),
        0xfa | 0xfe..=0x105 | 0x108 | 0x109 => {
            return Some(Cow::Owned(format!("UNK_DATA_{:X}", kind)))
        }
        _ => return None,
    };
    Some(Cow::Borrowed(name))
}

/// The records of one command. The variant must agree with the command's type.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyMm {
    Stop,
    ActorCue(Vec<ActorCue>),
    Misc(Vec<FrameCue>),
    LightSetting(Vec<FrameCue>),
    Transition(Vec<FrameCue>),
    MotionBlur(Vec<FrameCue>),
    GiveTatl(Vec<FrameCue>),
    StartSeq(Vec<FrameCue>),
    StopSeq(Vec<FrameCue>),
    StartAmbience(Vec<FrameCue>),
    FadeOutAmbience(Vec<FrameCue>),
    SfxReverbIndex2(Vec<FrameCue>),
    SfxReverbIndex1(Vec<FrameCue>),
    ModifySeq(Vec<FrameCue>),
    Destination(Vec<FrameCue>),
    ChooseCreditsScenes(Vec<FrameCue>),
    FadeOutSeq(Vec<FrameCue>),
    TransitionGeneral(Vec<ColorCue>),
    Time(Vec<TimeCue>),
    Text(Vec<TextCue>),
    Rumble(Vec<RumbleCue>),
    /// Camera spline data, kept as raw bytes.
    CameraSpline(Vec<u8>),
    /// A defined command whose records are not decoded.
    Unimplemented(Vec<RawRecord>),
}

impl BodyMm {
    /// Value of the entry count field: the number of records, or the byte length of a camera
    /// spline.
    pub fn entry_count(&self) -> u32 {
        let len = match self {
            BodyMm::Stop => 0,
            BodyMm::ActorCue(v) => v.len(),
            BodyMm::Misc(v)
            | BodyMm::LightSetting(v)
            | BodyMm::Transition(v)
            | BodyMm::MotionBlur(v)
            | BodyMm::GiveTatl(v)
            | BodyMm::StartSeq(v)
            | BodyMm::StopSeq(v)
            | BodyMm::StartAmbience(v)
            | BodyMm::FadeOutAmbience(v)
            | BodyMm::SfxReverbIndex2(v)
            | BodyMm::SfxReverbIndex1(v)
            | BodyMm::ModifySeq(v)
            | BodyMm::Destination(v)
            | BodyMm::ChooseCreditsScenes(v)
            | BodyMm::FadeOutSeq(v) => v.len(),
            BodyMm::TransitionGeneral(v) => v.len(),
            BodyMm::Time(v) => v.len(),
            BodyMm::Text(v) => v.len(),
            BodyMm::Rumble(v) => v.len(),
            BodyMm::CameraSpline(bytes) => bytes.len(),
            BodyMm::Unimplemented(v) => v.len(),
        };
        len as u32
    }

    fn read(c: &mut Cursor<'_>, kind: u32, count: u32, offset: u32) -> Result<Self, CutsceneError> {
        if is_actor_cue(kind) {
            return Ok(BodyMm::ActorCue(read_records(c, count, ACTOR_CUE_SIZE)?));
        }
        Ok(match kind {
            CS_STOP => BodyMm::Stop,
            MISC => BodyMm::Misc(read_records(c, count, RECORD_SIZE)?),
            LIGHT_SETTING => BodyMm::LightSetting(read_records(c, count, RECORD_SIZE)?),
            TRANSITION => BodyMm::Transition(read_records(c, count, RECORD_SIZE)?),
            MOTION_BLUR => BodyMm::MotionBlur(read_records(c, count, RECORD_SIZE)?),
            GIVE_TATL => BodyMm::GiveTatl(read_records(c, count, RECORD_SIZE)?),
            START_SEQ => BodyMm::StartSeq(read_records(c, count, RECORD_SIZE)?),
            STOP_SEQ => BodyMm::StopSeq(read_records(c, count, RECORD_SIZE)?),
            START_AMBIENCE => BodyMm::StartAmbience(read_records(c, count, RECORD_SIZE)?),
            FADE_OUT_AMBIENCE => BodyMm::FadeOutAmbience(read_records(c, count, RECORD_SIZE)?),
            SFX_REVERB_INDEX_2 => BodyMm::SfxReverbIndex2(read_records(c, count, RECORD_SIZE)?),
            SFX_REVERB_INDEX_1 => BodyMm::SfxReverbIndex1(read_records(c, count, RECORD_SIZE)?),
            MODIFY_SEQ => BodyMm::ModifySeq(read_records(c, count, RECORD_SIZE)?),
            DESTINATION => BodyMm::Destination(read_records(c, count, RECORD_SIZE)?),
            CHOOSE_CREDITS_SCENES => {
                BodyMm::ChooseCreditsScenes(read_records(c, count, RECORD_SIZE)?)
            }
            FADE_OUT_SEQ => BodyMm::FadeOutSeq(read_records(c, count, LONG_RECORD_SIZE)?),
            TRANSITION_GENERAL => {
                BodyMm::TransitionGeneral(read_records(c, count, LONG_RECORD_SIZE)?)
            }
            TIME => BodyMm::Time(read_records(c, count, LONG_RECORD_SIZE)?),
            TEXT => BodyMm::Text(read_records(c, count, LONG_RECORD_SIZE)?),
            RUMBLE => BodyMm::Rumble(read_records(c, count, LONG_RECORD_SIZE)?),
            CAMERA_SPLINE => BodyMm::CameraSpline(c.bytes(count)?.to_vec()),
            _ => match command_name(kind) {
                Some(name) => {
                    log::debug!("keeping {} undecoded", name);
                    BodyMm::Unimplemented(RawRecord::read_list(c, count, RECORD_SIZE)?)
                }
                None => return Err(CutsceneError::UnknownCommand { kind, offset }),
            },
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        match self {
            BodyMm::Stop => (),
            BodyMm::ActorCue(v) => write_records(ctx, v, ACTOR_CUE_SIZE),
            BodyMm::Misc(v)
            | BodyMm::LightSetting(v)
            | BodyMm::Transition(v)
            | BodyMm::MotionBlur(v)
            | BodyMm::GiveTatl(v)
            | BodyMm::StartSeq(v)
            | BodyMm::StopSeq(v)
            | BodyMm::StartAmbience(v)
            | BodyMm::FadeOutAmbience(v)
            | BodyMm::SfxReverbIndex2(v)
            | BodyMm::SfxReverbIndex1(v)
            | BodyMm::ModifySeq(v)
            | BodyMm::Destination(v)
            | BodyMm::ChooseCreditsScenes(v) => write_records(ctx, v, RECORD_SIZE),
            BodyMm::FadeOutSeq(v) => write_records(ctx, v, LONG_RECORD_SIZE),
            BodyMm::TransitionGeneral(v) => write_records(ctx, v, LONG_RECORD_SIZE),
            BodyMm::Time(v) => write_records(ctx, v, LONG_RECORD_SIZE),
            BodyMm::Text(v) => write_records(ctx, v, LONG_RECORD_SIZE),
            BodyMm::Rumble(v) => write_records(ctx, v, LONG_RECORD_SIZE),
            BodyMm::CameraSpline(bytes) => ctx.put_bytes(bytes),
            BodyMm::Unimplemented(v) => RawRecord::write_list(ctx, v, RECORD_SIZE),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandMm {
    pub kind: u32,
    pub body: BodyMm,
}

impl CommandMm {
    pub fn name(&self) -> Cow<'static, str> {
        command_name(self.kind).unwrap_or_else(|| Cow::Owned(format!("0x{:08x}", self.kind)))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CutsceneMm {
    pub frame_count: i32,
    pub commands: Vec<CommandMm>,
}

impl CutsceneMm {
    /// Decodes the cutscene at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the stream runs off the end of `data`, an entry count is negative, or a command
    /// type is not one the game defines.
    pub fn parse(data: &[u8], offset: u32) -> Result<CutsceneMm, CutsceneError> {
        let mut c = Cursor::new(data, offset);
        let total: i32 = c.read()?;
        let frame_count: i32 = c.read()?;
        let mut commands = vec![];
        for _ in 0..total.max(0) {
            let at = c.offset();
            let kind: u32 = c.read()?;
            let count: i32 = c.read()?;
            if count < 0 {
                return Err(CutsceneError::BadEntryCount { kind, count });
            }
            let body = BodyMm::read(&mut c, kind, count as u32, at)?;
            let stop = body == BodyMm::Stop;
            let command = CommandMm { kind, body };
            log::trace!("0x{:06x}: {} x{}", at, command.name(), count);
            commands.push(command);
            if stop {
                break;
            }
        }
        Ok(CutsceneMm {
            frame_count,
            commands,
        })
    }

    pub fn parse_at(
        segment_table: &SegmentTable<'_>,
        addr: SegmentAddr,
    ) -> Result<CutsceneMm, CutsceneError> {
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
            ctx.put32(command.body.entry_count());
            command.body.write(ctx);
            if command.body == BodyMm::Stop {
                break;
            }
        }
        ctx.pop()
    }
}

/// One entry of a scene's cutscene list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CutsceneListMm {
    /// `None` for a null script pointer.
    pub script: Option<CutsceneMm>,
    pub next_entrance: i16,
    pub spawn: u8,
    pub spawn_flags: u8,
}

impl CutsceneListMm {
    /// Reads `count` list entries and the cutscene each one points at.
    pub fn parse(
        segment_table: &SegmentTable<'_>,
        addr: SegmentAddr,
        count: u8,
    ) -> Result<Vec<CutsceneListMm>, CutsceneError> {
        let data = segment_table.get(addr.segment())?;
        (0..u32::from(count))
            .map(|i| -> Result<_, CutsceneError> {
                let mut c = Cursor::new(data, addr.offset() + i * LIST_ENTRY_SIZE);
                let script: SegmentAddr = c.read()?;
                let script = match script.non_null() {
                    Some(script) => Some(CutsceneMm::parse_at(segment_table, script)?),
                    None => None,
                };
                Ok(CutsceneListMm {
                    script,
                    next_entrance: c.read()?,
                    spawn: c.read()?,
                    spawn_flags: c.read()?,
                })
            })
            .collect()
    }

    pub fn write(ctx: &mut WriteContext, list: &[CutsceneListMm]) -> SegmentAddr {
        ctx.push(4);
        for entry in list {
            let script = match &entry.script {
                Some(script) => script.write(ctx),
                None => SegmentAddr::NULL,
            };
            ctx.put_addr(script);
            ctx.put16(entry.next_entrance as u16);
            ctx.put8(entry.spawn);
            ctx.put8(entry.spawn_flags);
        }
        ctx.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z64scene_segment::Segment;

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect()
    }

    fn sample() -> Vec<u8> {
        let mut data = words(&[5, 300]);
        // two misc records
        data.extend(words(&[MISC, 2, 0x0001_0000, 0x0010_0000, 0x0002_0010, 0x0020_0000]));
        // camera spline, eight raw bytes
        data.extend(words(&[CAMERA_SPLINE, 8, 0x0102_0304, 0x0506_0708]));
        // an undecoded command
        data.extend(words(&[0x108, 1, 0xdead_beef, 0x1234_5678]));
        data.extend(words(&[TRANSITION_GENERAL, 1, 0x0003_0000, 0x0020_ff80, 0x4000_0000]));
        data.extend(words(&[CS_STOP, 0]));
        data
    }

    #[test]
    fn parse_sample() {
        let data = sample();
        let cs = CutsceneMm::parse(&data, 0).unwrap();
        assert_eq!(cs.frame_count, 300);
        assert_eq!(cs.commands.len(), 5);
        match &cs.commands[0].body {
            BodyMm::Misc(misc) => {
                assert_eq!(misc.len(), 2);
                assert_eq!(misc[1].value, 2);
                assert_eq!(misc[1].start_frame, 0x10);
                assert_eq!(misc[1].end_frame, 0x20);
            }
            other => panic!("expected misc, got {:?}", other),
        }
        assert_eq!(
            cs.commands[1].body,
            BodyMm::CameraSpline(vec![1, 2, 3, 4, 5, 6, 7, 8])
        );
        assert_eq!(cs.commands[2].name(), "UNK_DATA_108");
        assert_eq!(
            cs.commands[2].body,
            BodyMm::Unimplemented(vec![RawRecord(vec![
                0xde, 0xad, 0xbe, 0xef, 0x12, 0x34, 0x56, 0x78
            ])])
        );
        assert_eq!(
            cs.commands[3].body,
            BodyMm::TransitionGeneral(vec![ColorCue {
                type_: 3,
                start_frame: 0,
                end_frame: 0x20,
                color: [0xff, 0x80, 0x40],
            }])
        );
        assert_eq!(cs.commands[4].body, BodyMm::Stop);
    }

    #[test]
    fn write_reproduces_input() {
        let data = sample();
        let cs = CutsceneMm::parse(&data, 0).unwrap();
        let mut ctx = WriteContext::new(Segment::SCENE);
        cs.write(&mut ctx);
        assert_eq!(ctx.finish(), data);
    }

    #[test]
    fn actor_cue_ranges() {
        assert!(is_actor_cue(100));
        assert!(is_actor_cue(149));
        assert!(!is_actor_cue(150));
        assert!(is_actor_cue(PLAYER_CUE));
        assert!(is_actor_cue(201));
        assert!(!is_actor_cue(202));
        assert!(is_actor_cue(599));
        assert!(!is_actor_cue(600));
        assert_eq!(command_name(450).unwrap(), "ACTOR_CUE_450");
    }

    #[test]
    fn undefined_command_aborts() {
        let data = words(&[1, 10, 0x0b, 0]);
        assert!(matches!(
            CutsceneMm::parse(&data, 0),
            Err(CutsceneError::UnknownCommand { kind: 0x0b, offset: 8 })
        ));
    }

    #[test]
    fn cutscene_list_owns_scripts() {
        let mut data = words(&[0x0200_0010, 0xfffe_0100, 0, 0]);
        data.extend(words(&[1, 20, CS_STOP, 0]));
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let list = CutsceneListMm::parse(&table, SegmentAddr(0x0200_0000), 2).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].next_entrance, -2);
        assert_eq!(list[0].spawn, 1);
        assert_eq!(list[0].script.as_ref().unwrap().frame_count, 20);
        assert_eq!(list[1].script, None);

        let mut ctx = WriteContext::new(Segment::SCENE);
        let addr = CutsceneListMm::write(&mut ctx, &list);
        let out = ctx.finish();
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &out);
        assert_eq!(CutsceneListMm::parse(&table, addr, 2).unwrap(), list);
    }
}
