//! MM actor cutscenes (scene command 0x1B) and their cameras (scene command 0x02).

use z64scene_read::{Cursor, FromData, Layout, ReadError, Slice};
use z64scene_segment::{SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ActorCutscene {
    pub priority: i16,
    pub length: i16,
    pub cs_cam_id: i16,
    pub script_index: i16,
    pub additional_cs_id: i16,
    pub end_sfx: u8,
    pub custom_value: u8,
    pub hud_visibility: i16,
    pub end_cam: u8,
    pub letterbox_size: u8,
}

impl Layout for ActorCutscene {
    const SIZE: u32 = 0x10;
}

impl FromData for ActorCutscene {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            priority: c.read()?,
            length: c.read()?,
            cs_cam_id: c.read()?,
            script_index: c.read()?,
            additional_cs_id: c.read()?,
            end_sfx: c.read()?,
            custom_value: c.read()?,
            hud_visibility: c.read()?,
            end_cam: c.read()?,
            letterbox_size: c.read()?,
        })
    }
}

impl ActorCutscene {
    fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.priority as u16);
        ctx.put16(self.length as u16);
        ctx.put16(self.cs_cam_id as u16);
        ctx.put16(self.script_index as u16);
        ctx.put16(self.additional_cs_id as u16);
        ctx.put8(self.end_sfx);
        ctx.put8(self.custom_value);
        ctx.put16(self.hud_visibility as u16);
        ctx.put8(self.end_cam);
        ctx.put8(self.letterbox_size);
    }
}

pub fn parse_actor_cutscenes(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
    count: u8,
) -> Result<Vec<ActorCutscene>, ReadError> {
    Slice::new(addr, count as u32).read_all(segment_table)
}

pub fn write_actor_cutscenes(ctx: &mut WriteContext, cutscenes: &[ActorCutscene]) -> SegmentAddr {
    ctx.push(4);
    for cutscene in cutscenes {
        cutscene.write(ctx);
    }
    ctx.pop()
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ActorCutsceneCamera {
    pub setting: i16,
    pub points: Vec<[i16; 3]>,
}

const CAMERA_ENTRY_SIZE: u32 = 8;

pub fn parse_actor_cutscene_cameras(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
    count: u8,
) -> Result<Vec<ActorCutsceneCamera>, ReadError> {
    (0..count as u32)
        .map(|i| -> Result<_, ReadError> {
            let entry = SegmentAddr(addr.0 + i * CAMERA_ENTRY_SIZE);
            let mut c = Cursor::new(segment_table.get(entry.segment())?, entry.offset());
            let setting = c.read()?;
            let num_points: i16 = c.read()?;
            let points: SegmentAddr = c.read()?;
            let points = match points.non_null() {
                Some(points) if num_points > 0 => {
                    Slice::new(points, num_points as u32).read_all(segment_table)?
                }
                _ => vec![],
            };
            Ok(ActorCutsceneCamera { setting, points })
        })
        .collect()
}

pub fn write_actor_cutscene_cameras(
    ctx: &mut WriteContext,
    cameras: &[ActorCutsceneCamera],
) -> SegmentAddr {
    ctx.push(4);
    for camera in cameras {
        ctx.push(2);
        for point in &camera.points {
            for &v in point {
                ctx.put16(v as u16);
            }
        }
        let points = ctx.pop();
        ctx.put16(camera.setting as u16);
        ctx.put16(camera.points.len() as u16);
        ctx.put_addr(points);
    }
    ctx.pop()
}
