//! MM animated materials (scene command 0x1A).

use z64scene_read::{Cursor, ReadError};
use z64scene_segment::{SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

use crate::BlobLookup;

const ENTRY_SIZE: u32 = 8;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct TexScroll {
    pub x_step: i8,
    pub y_step: i8,
    pub width: u8,
    pub height: u8,
}

impl TexScroll {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            x_step: c.read()?,
            y_step: c.read()?,
            width: c.read()?,
            height: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        ctx.put8(self.x_step as u8);
        ctx.put8(self.y_step as u8);
        ctx.put8(self.width);
        ctx.put8(self.height);
    }
}

/// Primitive and environment colour keyframes.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ColorParams {
    pub key_frame_length: u16,
    pub key_frame_count: u16,
    /// r, g, b, a, lod fraction.
    pub prim: Vec<[u8; 5]>,
    pub env: Option<Vec<[u8; 4]>>,
    pub key_frames: Option<Vec<u16>>,
}

/// A texture flipbook: one texture index per frame.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct TexCycleParams {
    pub key_frame_length: u16,
    pub textures: Vec<SegmentAddr>,
    pub indices: Vec<u8>,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AnimatedMaterialParams {
    Scroll(TexScroll),
    TwoScroll([TexScroll; 2]),
    Color(ColorParams),
    Cycle(TexCycleParams),
    Empty,
    /// Unrecognised type; the parameter pointer is kept as it was.
    Unknown(SegmentAddr),
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AnimatedMaterial {
    /// Display list segment, negated on the last entry of a list.
    pub segment: i8,
    pub kind: i16,
    pub params: AnimatedMaterialParams,
}

impl AnimatedMaterial {
    pub fn is_last(&self) -> bool {
        self.segment < 0
    }

    fn parse(
        segment_table: &SegmentTable<'_>,
        addr: SegmentAddr,
    ) -> Result<AnimatedMaterial, ReadError> {
        let mut c = cursor_at(segment_table, addr)?;
        let segment: i8 = c.read()?;
        c.skip(1);
        let kind: i16 = c.read()?;
        let ptr: SegmentAddr = c.read()?;

        let params_cursor = || cursor_at(segment_table, ptr);
        let params = match kind {
            0 => AnimatedMaterialParams::Scroll(TexScroll::read(&mut params_cursor()?)?),
            1 => {
                let mut p = params_cursor()?;
                let first = TexScroll::read(&mut p)?;
                AnimatedMaterialParams::TwoScroll([first, TexScroll::read(&mut p)?])
            }
            2..=4 => {
                AnimatedMaterialParams::Color(parse_color(segment_table, params_cursor()?, kind)?)
            }
            5 => AnimatedMaterialParams::Cycle(parse_cycle(segment_table, params_cursor()?)?),
            6 => AnimatedMaterialParams::Empty,
            _ => AnimatedMaterialParams::Unknown(ptr),
        };
        Ok(AnimatedMaterial {
            segment,
            kind,
            params,
        })
    }

    fn write_params(&self, ctx: &mut WriteContext, lookup: &BlobLookup<'_>) -> SegmentAddr {
        match &self.params {
            AnimatedMaterialParams::Scroll(scroll) => {
                ctx.push(4);
                scroll.write(ctx);
                ctx.pop()
            }
            AnimatedMaterialParams::TwoScroll(scrolls) => {
                ctx.push(4);
                scrolls[0].write(ctx);
                scrolls[1].write(ctx);
                ctx.pop()
            }
            AnimatedMaterialParams::Color(color) => write_color(ctx, color),
            AnimatedMaterialParams::Cycle(cycle) => write_cycle(ctx, cycle, lookup),
            AnimatedMaterialParams::Empty => SegmentAddr::NULL,
            AnimatedMaterialParams::Unknown(ptr) => *ptr,
        }
    }
}

fn cursor_at<'a>(
    segment_table: &SegmentTable<'a>,
    ptr: SegmentAddr,
) -> Result<Cursor<'a>, ReadError> {
    Ok(Cursor::new(segment_table.get(ptr.segment())?, ptr.offset()))
}

fn read_array<T>(
    segment_table: &SegmentTable<'_>,
    ptr: SegmentAddr,
    count: u32,
    mut read: impl FnMut(&mut Cursor<'_>) -> Result<T, ReadError>,
) -> Result<Vec<T>, ReadError> {
    let mut c = cursor_at(segment_table, ptr)?;
    (0..count).map(|_| read(&mut c)).collect()
}

fn parse_color(
    segment_table: &SegmentTable<'_>,
    mut c: Cursor<'_>,
    kind: i16,
) -> Result<ColorParams, ReadError> {
    let key_frame_length: u16 = c.read()?;
    let key_frame_count: u16 = c.read()?;
    let prim_ptr: SegmentAddr = c.read()?;
    let env_ptr: SegmentAddr = c.read()?;
    let key_frames_ptr: SegmentAddr = c.read()?;

    let count = u32::from(if kind == 2 {
        key_frame_length
    } else {
        key_frame_count
    });
    let prim = read_array(segment_table, prim_ptr, count, |c| {
        Ok([c.read()?, c.read()?, c.read()?, c.read()?, c.read()?])
    })?;
    let env = match env_ptr.non_null() {
        Some(ptr) => Some(read_array(segment_table, ptr, count, |c| {
            Ok([c.read()?, c.read()?, c.read()?, c.read()?])
        })?),
        None => None,
    };
    let key_frames = match key_frames_ptr.non_null() {
        Some(ptr) if kind != 2 => Some(read_array(segment_table, ptr, count, |c| c.read())?),
        _ => None,
    };
    Ok(ColorParams {
        key_frame_length,
        key_frame_count,
        prim,
        env,
        key_frames,
    })
}

fn write_color(ctx: &mut WriteContext, color: &ColorParams) -> SegmentAddr {
    ctx.push(4);
    ctx.push(4);
    for prim in &color.prim {
        ctx.put_bytes(prim);
    }
    let prim = ctx.pop();
    let env = match &color.env {
        Some(env) => {
            ctx.push(4);
            for env in env {
                ctx.put_bytes(env);
            }
            ctx.pop()
        }
        None => SegmentAddr::NULL,
    };
    let key_frames = match &color.key_frames {
        Some(frames) => {
            ctx.push(2);
            for &frame in frames {
                ctx.put16(frame);
            }
            ctx.pop()
        }
        None => SegmentAddr::NULL,
    };
    ctx.put16(color.key_frame_length);
    ctx.put16(color.key_frame_count);
    ctx.put_addr(prim);
    ctx.put_addr(env);
    ctx.put_addr(key_frames);
    ctx.pop()
}

fn parse_cycle(
    segment_table: &SegmentTable<'_>,
    mut c: Cursor<'_>,
) -> Result<TexCycleParams, ReadError> {
    let key_frame_length: u16 = c.read()?;
    c.skip(2);
    let textures_ptr: SegmentAddr = c.read()?;
    let indices_ptr: SegmentAddr = c.read()?;
    let indices = read_array(segment_table, indices_ptr, key_frame_length as u32, |c| c.read())?;
    let texture_count = indices.iter().max().map_or(0, |&max| max as u32 + 1);
    let textures = read_array(segment_table, textures_ptr, texture_count, |c| c.read())?;
    Ok(TexCycleParams {
        key_frame_length,
        textures,
        indices,
    })
}

fn write_cycle(
    ctx: &mut WriteContext,
    cycle: &TexCycleParams,
    lookup: &BlobLookup<'_>,
) -> SegmentAddr {
    ctx.push(4);
    ctx.push(4);
    for &texture in &cycle.textures {
        ctx.put_addr(lookup.relocate(texture));
    }
    let textures = ctx.pop();
    ctx.push(4);
    ctx.put_bytes(&cycle.indices);
    let indices = ctx.pop();
    ctx.put16(cycle.key_frame_length);
    ctx.put_addr(textures);
    ctx.put_addr(indices);
    ctx.pop()
}

/// Reads materials up to and including the first one flagged as last.
pub fn parse_animated_materials(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
) -> Result<Vec<AnimatedMaterial>, ReadError> {
    let mut materials = vec![];
    let mut entry = addr;
    loop {
        let material = AnimatedMaterial::parse(segment_table, entry)?;
        let last = material.is_last();
        materials.push(material);
        if last {
            return Ok(materials);
        }
        entry = SegmentAddr(entry.0 + ENTRY_SIZE);
    }
}

pub fn write_animated_materials(
    ctx: &mut WriteContext,
    materials: &[AnimatedMaterial],
    lookup: &BlobLookup<'_>,
) -> SegmentAddr {
    ctx.push(4);
    for material in materials {
        let params = material.write_params(ctx, lookup);
        ctx.put8(material.segment as u8);
        ctx.put8(0);
        ctx.put16(material.kind as u16);
        ctx.put_addr(params);
    }
    ctx.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use z64scene_segment::Segment;

    fn file() -> Vec<u8> {
        let mut out = vec![
            // 0x00: scroll on segment 8, cycle on segment 9 (last)
            0x08, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x18, //
            0xf7, 0x00, 0x00, 0x05, 0x02, 0x00, 0x00, 0x1c, //
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x10: unread
            0x01, 0xff, 0x20, 0x10, // 0x18: scroll
            0x00, 0x04, 0x00, 0x00, 0x02, 0x00, 0x00, 0x28, 0x02, 0x00, 0x00, 0x30, // 0x1c: cycle
            0x02, 0x00, 0x01, 0x00, 0x02, 0x00, 0x01, 0x00, // 0x28: two textures
            0x00, 0x01, 0x01, 0x00, // 0x30: indices
        ];
        out.resize(0x40, 0);
        out
    }

    #[test]
    fn parse_stops_after_last_entry() {
        let data = file();
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let materials = parse_animated_materials(&table, SegmentAddr(0x0200_0000)).unwrap();
        assert_eq!(materials.len(), 2);
        assert_eq!(
            materials[0].params,
            AnimatedMaterialParams::Scroll(TexScroll {
                x_step: 1,
                y_step: -1,
                width: 0x20,
                height: 0x10,
            })
        );
        assert!(materials[1].is_last());
        match &materials[1].params {
            AnimatedMaterialParams::Cycle(cycle) => {
                assert_eq!(cycle.key_frame_length, 4);
                assert_eq!(cycle.indices, vec![0, 1, 1, 0]);
                assert_eq!(
                    cycle.textures,
                    vec![SegmentAddr(0x0200_0100), SegmentAddr(0x0200_0100)]
                );
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn written_materials_read_back() {
        let data = file();
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let materials = parse_animated_materials(&table, SegmentAddr(0x0200_0000)).unwrap();

        let lookup = BlobLookup::new(vec![]);
        let mut ctx = WriteContext::new(Segment::SCENE);
        let addr = write_animated_materials(&mut ctx, &materials, &lookup);
        let out = ctx.finish();
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &out);
        assert_eq!(parse_animated_materials(&table, addr).unwrap(), materials);
    }
}
