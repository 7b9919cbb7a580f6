use derive_more::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use z64scene_read::{Cursor, FromData, Layout, ReadError};
use z64scene_write::WriteContext;

use crate::Game;

/// Which list an instance was placed in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InstanceTab {
    Actor,
    Door,
    Spawn,
}

/// An instance record exactly as stored: `u16 id, i16 pos[3], u16 rot[3], u16 params`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct WritableInstance {
    pub id: u16,
    pub pos: [i16; 3],
    pub rot: [u16; 3],
    pub params: u16,
}

impl WritableInstance {
    pub fn write(&self, ctx: &mut WriteContext) {
        ctx.put16(self.id);
        for &p in &self.pos {
            ctx.put16(p as u16);
        }
        for &r in &self.rot {
            ctx.put16(r);
        }
        ctx.put16(self.params);
    }
}

impl Layout for WritableInstance {
    const SIZE: u32 = 0x10;
}

impl FromData for WritableInstance {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            id: c.read()?,
            pos: c.read()?,
            rot: [c.read()?, c.read()?, c.read()?],
            params: c.read()?,
        })
    }
}

/// Per-axis flags that select plain degrees instead of a binary angle (MM only).
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, BitAnd, BitAndAssign, BitOr, BitOrAssign,
)]
pub struct RawRotation(pub u8);

impl RawRotation {
    pub const NONE: RawRotation = RawRotation(0);
    pub const X: RawRotation = RawRotation(0b100);
    pub const Y: RawRotation = RawRotation(0b010);
    pub const Z: RawRotation = RawRotation(0b001);

    const AXES: [RawRotation; 3] = [RawRotation::X, RawRotation::Y, RawRotation::Z];

    pub fn contains(self, other: RawRotation) -> bool {
        self & other == other
    }
}

/// Data MM packs into the spare bits of an instance record.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MmSpawnData {
    pub raw_rotation: RawRotation,
    /// Low 7 bits of the y rotation word.
    pub cutscene_index: u8,
    /// Ten bits spread over the x and z rotation words.
    pub half_day_bits: u16,
    /// The top four of the x rotation word's low 7 bits.
    pub spare: u8,
}

const MM_ID_MASK: u16 = 0x1fff;
const MM_ROT_SHIFT: u32 = 7;
const MM_EXTRA_MASK: u16 = 0x7f;
const MM_ANGLE_MASK: u16 = !MM_EXTRA_MASK;

/// A placed actor, door or spawn point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Instance {
    pub tab: InstanceTab,
    pub id: u16,
    pub pos: [i16; 3],
    /// Binary angles, or degrees on the axes flagged in `mm.raw_rotation`.
    pub rot: [i16; 3],
    pub params: u16,
    /// Always default in OoT.
    pub mm: MmSpawnData,
}

impl Instance {
    pub fn from_writable(w: WritableInstance, game: Game, tab: InstanceTab) -> Self {
        match game {
            Game::Oot => Self {
                tab,
                id: w.id,
                pos: w.pos,
                rot: [w.rot[0] as i16, w.rot[1] as i16, w.rot[2] as i16],
                params: w.params,
                mm: MmSpawnData::default(),
            },
            Game::Mm => {
                let raw_rotation = RawRotation((w.id >> 13) as u8);
                let mut rot = [0; 3];
                for (i, axis) in RawRotation::AXES.iter().enumerate() {
                    rot[i] = if raw_rotation.contains(*axis) {
                        (w.rot[i] >> MM_ROT_SHIFT) as i16
                    } else {
                        (w.rot[i] & MM_ANGLE_MASK) as i16
                    };
                }
                let x_low = w.rot[0] & MM_EXTRA_MASK;
                let z_low = w.rot[2] & MM_EXTRA_MASK;
                Self {
                    tab,
                    id: w.id & MM_ID_MASK,
                    pos: w.pos,
                    rot,
                    params: w.params,
                    mm: MmSpawnData {
                        raw_rotation,
                        cutscene_index: (w.rot[1] & MM_EXTRA_MASK) as u8,
                        half_day_bits: ((x_low & 0x7) << 7) | z_low,
                        spare: (x_low >> 3) as u8,
                    },
                }
            }
        }
    }

    pub fn to_writable(&self, game: Game) -> WritableInstance {
        match game {
            Game::Oot => WritableInstance {
                id: self.id,
                pos: self.pos,
                rot: [self.rot[0] as u16, self.rot[1] as u16, self.rot[2] as u16],
                params: self.params,
            },
            Game::Mm => {
                let mm = &self.mm;
                let extra = [
                    ((mm.spare as u16 & 0xf) << 3) | ((mm.half_day_bits >> 7) & 0x7),
                    mm.cutscene_index as u16 & MM_EXTRA_MASK,
                    mm.half_day_bits & MM_EXTRA_MASK,
                ];
                let mut rot = [0; 3];
                for (i, axis) in RawRotation::AXES.iter().enumerate() {
                    let angle = if mm.raw_rotation.contains(*axis) {
                        (self.rot[i] as u16) << MM_ROT_SHIFT
                    } else {
                        self.rot[i] as u16 & MM_ANGLE_MASK
                    };
                    rot[i] = angle | extra[i];
                }
                WritableInstance {
                    id: (self.id & MM_ID_MASK) | ((mm.raw_rotation.0 as u16 & 0x7) << 13),
                    pos: self.pos,
                    rot,
                    params: self.params,
                }
            }
        }
    }

    pub fn parse(
        data: &[u8],
        offset: u32,
        game: Game,
        tab: InstanceTab,
    ) -> Result<Self, ReadError> {
        Ok(Self::from_writable(
            WritableInstance::from_data(data, offset)?,
            game,
            tab,
        ))
    }

    pub fn write(&self, ctx: &mut WriteContext, game: Game) {
        self.to_writable(game).write(ctx);
    }
}

/// Reads `count` consecutive instance records.
pub fn parse_instances(
    data: &[u8],
    offset: u32,
    count: u32,
    game: Game,
    tab: InstanceTab,
) -> Result<Vec<Instance>, ReadError> {
    (0..count)
        .map(|i| Instance::parse(data, offset + i * WritableInstance::SIZE, game, tab))
        .collect()
}
