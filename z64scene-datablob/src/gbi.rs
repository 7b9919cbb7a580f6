//! The subset of F3DEX2 display list commands that locate data in memory.

use byteorder::{BigEndian, ReadBytesExt};
use num_traits::FromPrimitive;
use std::fmt::{self, Debug, Formatter};
use std::ops::Not;
use z64scene_segment::SegmentAddr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    // 0x01
    Vtx {
        count: u8,
        ptr: SegmentAddr,
    },
    // 0xda
    Mtx {
        flags: MtxFlags,
        ptr: SegmentAddr,
    },
    // 0xde
    Dl {
        jump: bool,
        ptr: SegmentAddr,
    },
    // 0xdf
    EndDl,
    // 0xf0
    LoadTlut {
        tile: u8,
        count: u16,
    },
    // 0xf2
    SetTileSize {
        tile: u8,
        width: u16,
        height: u16,
    },
    // 0xf5
    SetTile {
        format: TextureFormat,
        depth: TextureDepth,
        tile: u8,
        palette: u8,
    },
    // 0xfd
    SetTimg {
        format: TextureFormat,
        depth: TextureDepth,
        width: u16,
        ptr: SegmentAddr,
    },
    Other {
        opcode: u8,
    },
}

impl Instruction {
    pub const SIZE: u32 = 8;

    /// Decodes one command.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than [`Instruction::SIZE`].
    pub fn parse(data: &[u8]) -> Instruction {
        let u32_a = (&data[..]).read_u32::<BigEndian>().unwrap() & 0x00ff_ffff;
        let u32_b = (&data[4..]).read_u32::<BigEndian>().unwrap();
        match data[0] {
            0x01 => Instruction::Vtx {
                count: (u32_a >> 12) as u8,
                ptr: SegmentAddr(u32_b),
            },
            0xda => Instruction::Mtx {
                flags: MtxFlags(data[3]),
                ptr: SegmentAddr(u32_b),
            },
            0xde => Instruction::Dl {
                jump: data[1] == 0x01,
                ptr: SegmentAddr(u32_b),
            },
            0xdf => Instruction::EndDl,
            0xf0 => Instruction::LoadTlut {
                tile: ((u32_b >> 24) & 0x07) as u8,
                count: ((u32_b >> 14) & 0x03ff) as u16 + 1,
            },
            0xf2 => {
                let start_s = ((u32_a >> 12) & 0x0fff) as u16;
                let start_t = (u32_a & 0x0fff) as u16;
                let end_s = ((u32_b >> 12) & 0x0fff) as u16;
                let end_t = (u32_b & 0x0fff) as u16;
                Instruction::SetTileSize {
                    tile: ((u32_b >> 24) & 0x07) as u8,
                    width: (end_s.saturating_sub(start_s) >> 2) + 1,
                    height: (end_t.saturating_sub(start_t) >> 2) + 1,
                }
            }
            0xf5 => Instruction::SetTile {
                format: TextureFormat::parse(data[1] >> 5),
                depth: TextureDepth::parse((data[1] >> 3) & 0x03),
                tile: ((u32_b >> 24) & 0x07) as u8,
                palette: ((u32_b >> 20) & 0x0f) as u8,
            },
            0xfd => Instruction::SetTimg {
                format: TextureFormat::parse(data[1] >> 5),
                depth: TextureDepth::parse((data[1] >> 3) & 0x03),
                width: (u32_a & 0x0fff) as u16 + 1,
                ptr: SegmentAddr(u32_b),
            },
            opcode => Instruction::Other { opcode },
        }
    }

    /// Whether this command ends the display list it appears in.
    pub fn is_terminator(self) -> bool {
        matches!(self, Instruction::Dl { jump: true, .. } | Instruction::EndDl)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextureFormat {
    Rgba,
    Yuv,
    Ci,
    Ia,
    I,
    Unknown(u8),
}

impl TextureFormat {
    pub fn parse(value: u8) -> TextureFormat {
        match value {
            0 => TextureFormat::Rgba,
            1 => TextureFormat::Yuv,
            2 => TextureFormat::Ci,
            3 => TextureFormat::Ia,
            4 => TextureFormat::I,
            x => TextureFormat::Unknown(x),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextureDepth {
    Bits4,
    Bits8,
    Bits16,
    Bits32,
}

impl TextureDepth {
    pub fn parse(value: u8) -> TextureDepth {
        match value & 0x03 {
            0 => TextureDepth::Bits4,
            1 => TextureDepth::Bits8,
            2 => TextureDepth::Bits16,
            _ => TextureDepth::Bits32,
        }
    }

    pub fn bits_per_texel<T: FromPrimitive>(self) -> T {
        match self {
            TextureDepth::Bits4 => T::from_u8(4).unwrap(),
            TextureDepth::Bits8 => T::from_u8(8).unwrap(),
            TextureDepth::Bits16 => T::from_u8(16).unwrap(),
            TextureDepth::Bits32 => T::from_u8(32).unwrap(),
        }
    }

    /// Bytes occupied by a `width` by `height` image at this depth.
    pub fn image_size(self, width: u16, height: u16) -> u32 {
        (width as u32 * height as u32 * self.bits_per_texel::<u32>() + 7) / 8
    }
}

#[derive(
    Clone,
    Copy,
    Eq,
    PartialEq,
    derive_more::BitAnd,
    derive_more::BitAndAssign,
    derive_more::BitOr,
    derive_more::BitOrAssign,
    derive_more::BitXor,
    derive_more::BitXorAssign,
)]
pub struct MtxFlags(pub u8);

impl Debug for MtxFlags {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} | {}",
            if self.test(MtxFlags::PROJECTION) {
                "PROJECTION"
            } else {
                "MODELVIEW"
            },
            if self.test(MtxFlags::LOAD) {
                "LOAD"
            } else {
                "MUL"
            },
        )?;
        if self.test(MtxFlags::PUSH) {
            write!(f, " | PUSH")?;
        }
        Ok(())
    }
}

impl MtxFlags {
    pub const NOPUSH: MtxFlags = MtxFlags(0x00);
    pub const PUSH: MtxFlags = MtxFlags(0x01);

    pub const MUL: MtxFlags = MtxFlags(0x00);
    pub const LOAD: MtxFlags = MtxFlags(0x02);

    pub const MODELVIEW: MtxFlags = MtxFlags(0x00);
    pub const PROJECTION: MtxFlags = MtxFlags(0x04);

    pub const ALL: MtxFlags = MtxFlags(0x07);

    pub fn test(self, mask: MtxFlags) -> bool {
        (self & mask) == mask
    }
}

impl Not for MtxFlags {
    type Output = MtxFlags;
    fn not(self) -> MtxFlags {
        self ^ MtxFlags::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pointer_commands() {
        assert_eq!(
            Instruction::parse(&[0x01, 0x00, 0x40, 0x08, 0x03, 0x00, 0x01, 0x00]),
            Instruction::Vtx {
                count: 4,
                ptr: SegmentAddr(0x0300_0100),
            }
        );
        assert_eq!(
            Instruction::parse(&[0xde, 0x01, 0x00, 0x00, 0x03, 0x00, 0x02, 0x00]),
            Instruction::Dl {
                jump: true,
                ptr: SegmentAddr(0x0300_0200),
            }
        );
        assert!(Instruction::parse(&[0xdf, 0, 0, 0, 0, 0, 0, 0]).is_terminator());
    }

    #[test]
    fn tile_size_in_texels() {
        // gsDPSetTileSize(G_TX_RENDERTILE, 0, 0, (32 - 1) << 2, (16 - 1) << 2)
        assert_eq!(
            Instruction::parse(&[0xf2, 0x00, 0x00, 0x00, 0x00, 0x07, 0xc0, 0x3c]),
            Instruction::SetTileSize {
                tile: 0,
                width: 32,
                height: 16,
            }
        );
        assert_eq!(TextureDepth::Bits4.image_size(32, 16), 256);
        assert_eq!(TextureDepth::Bits16.image_size(32, 16), 1024);
    }

    #[test]
    fn mtx_flags() {
        let flags = MtxFlags::PUSH | MtxFlags::LOAD;
        assert!(flags.test(MtxFlags::LOAD));
        assert!(!flags.test(MtxFlags::PROJECTION));
        assert_eq!(!flags, MtxFlags::PROJECTION);
    }
}
