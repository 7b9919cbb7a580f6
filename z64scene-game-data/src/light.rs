use std::fmt::{self, Debug, Formatter};
use z64scene_read::{Cursor, FromData, Layout, ReadError};
use z64scene_write::WriteContext;

#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            r: c.read()?,
            g: c.read()?,
            b: c.read()?,
        })
    }

    fn write(self, ctx: &mut WriteContext) {
        ctx.put8(self.r);
        ctx.put8(self.g);
        ctx.put8(self.b);
    }
}

impl Debug for RgbColor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One environment light setting.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Light {
    pub ambient: RgbColor,
    pub direction_a: [i8; 3],
    pub color_a: RgbColor,
    pub direction_b: [i8; 3],
    pub color_b: RgbColor,
    pub fog_color: RgbColor,
    /// Fog start in the low 10 bits, blend rate flags above.
    pub fog_near: u16,
    pub fog_far: u16,
}

impl Light {
    pub fn fog_start(&self) -> u16 {
        self.fog_near & 0x03ff
    }

    pub fn fog_flags(&self) -> u16 {
        self.fog_near >> 10
    }

    pub fn write(&self, ctx: &mut WriteContext) {
        self.ambient.write(ctx);
        for &d in &self.direction_a {
            ctx.put8(d as u8);
        }
        self.color_a.write(ctx);
        for &d in &self.direction_b {
            ctx.put8(d as u8);
        }
        self.color_b.write(ctx);
        self.fog_color.write(ctx);
        ctx.put16(self.fog_near);
        ctx.put16(self.fog_far);
    }
}

impl Layout for Light {
    const SIZE: u32 = 0x16;
}

impl FromData for Light {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        let ambient = RgbColor::read(&mut c)?;
        let direction_a = [c.read()?, c.read()?, c.read()?];
        let color_a = RgbColor::read(&mut c)?;
        let direction_b = [c.read()?, c.read()?, c.read()?];
        let color_b = RgbColor::read(&mut c)?;
        let fog_color = RgbColor::read(&mut c)?;
        Ok(Self {
            ambient,
            direction_a,
            color_a,
            direction_b,
            color_b,
            fog_color,
            fog_near: c.read()?,
            fog_far: c.read()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z64scene_segment::Segment;

    #[test]
    fn parse_light() {
        let data = [
            0x10, 0x20, 0x30, // ambient
            0x49, 0x49, 0xb7, // direction a
            0xff, 0xee, 0xdd, // color a
            0xb7, 0xb7, 0x49, // direction b
            0x01, 0x02, 0x03, // color b
            0x80, 0x90, 0xa0, // fog
            0x07, 0xe4, 0x32, 0x00,
        ];
        let light = Light::from_data(&data, 0).unwrap();
        assert_eq!(format!("{:?}", light.ambient), "#102030");
        assert_eq!(light.direction_a, [0x49, 0x49, -0x49]);
        assert_eq!(light.fog_start(), 0x3e4);
        assert_eq!(light.fog_flags(), 1);
        assert_eq!(light.fog_far, 0x3200);

        let mut ctx = WriteContext::new(Segment::SCENE);
        ctx.push(4);
        light.write(&mut ctx);
        ctx.pop();
        assert_eq!(ctx.finish(), data.to_vec());
    }
}
