use z64scene_read::{Cursor, FromData, Layout, ReadError, Slice};
use z64scene_segment::{SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

/// Camera index that selects no camera.
const NO_CAMERA: u32 = 0xff;

/// A scene's collision mesh with its surface, camera and water data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionHeader {
    pub min: [i16; 3],
    pub max: [i16; 3],
    pub vertices: Vec<[i16; 3]>,
    pub triangles: Vec<Triangle>,
    pub triangle_types: Vec<TriangleType>,
    /// `None` when the camera list pointer is null or no surface uses a camera. An empty list is
    /// written as a null pointer, so it never reads back as `Some`.
    pub cameras: Option<Vec<CameraData>>,
    pub water_boxes: Vec<WaterBox>,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Triangle {
    pub type_: u16,
    pub vertex_a_and_flags: u16,
    pub vertex_b_and_flags: u16,
    pub vertex_c_and_flags: u16,
    pub normal: [i16; 3],
    pub dist: i16,
}

impl Triangle {
    pub fn vertex_a(self) -> u16 {
        self.vertex_a_and_flags & 0x1fff
    }

    pub fn collision_flags(self) -> u8 {
        (self.vertex_a_and_flags >> 13) as u8
    }

    pub fn vertex_b(self) -> u16 {
        self.vertex_b_and_flags & 0x1fff
    }

    pub fn conveyor(self) -> bool {
        (self.vertex_b_and_flags & 0x2000) == 0x2000
    }

    pub fn vertex_c(self) -> u16 {
        self.vertex_c_and_flags & 0x1fff
    }
}

impl Layout for Triangle {
    const SIZE: u32 = 0x10;
}

impl FromData for Triangle {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            type_: c.read()?,
            vertex_a_and_flags: c.read()?,
            vertex_b_and_flags: c.read()?,
            vertex_c_and_flags: c.read()?,
            normal: c.read()?,
            dist: c.read()?,
        })
    }
}

/// Surface properties shared by triangles, as two packed words.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct TriangleType {
    pub high_value: u32,
    pub low_value: u32,
}

impl TriangleType {
    pub fn camera_index(self) -> u32 {
        self.high_value & 0xff
    }

    pub fn exit_index(self) -> u32 {
        (self.high_value >> 8) & 0x1f
    }
}

impl Layout for TriangleType {
    const SIZE: u32 = 8;
}

impl FromData for TriangleType {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(Self {
            high_value: u32::from_data(data, offset)?,
            low_value: u32::from_data(data, offset + 4)?,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CameraData {
    pub setting: u16,
    /// Stored count, used only when there is no point list.
    pub count: i16,
    pub points: Option<Vec<[i16; 3]>>,
}

impl CameraData {
    fn parse(
        segment_table: &SegmentTable<'_>,
        data: &[u8],
        offset: u32,
    ) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        let setting = c.read()?;
        let count: i16 = c.read()?;
        let ptr: SegmentAddr = c.read()?;
        let points = match ptr.non_null() {
            Some(ptr) => Some(Slice::new(ptr, count.max(0) as u32).read_all(segment_table)?),
            None => None,
        };
        Ok(Self {
            setting,
            count,
            points,
        })
    }

    fn write(&self, ctx: &mut WriteContext) {
        let (count, ptr) = match &self.points {
            Some(points) => (points.len() as i16, write_vec3s(ctx, points)),
            None => (self.count, SegmentAddr::NULL),
        };
        ctx.put16(self.setting);
        ctx.put16(count as u16);
        ctx.put_addr(ptr);
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct WaterBox {
    pub x_min: i16,
    pub y_surface: i16,
    pub z_min: i16,
    pub x_span: i16,
    pub z_span: i16,
    pub flags: u32,
}

impl WaterBox {
    pub fn camera_index(self) -> u32 {
        self.flags & 0xff
    }

    fn write(&self, ctx: &mut WriteContext) {
        for &v in &[self.x_min, self.y_surface, self.z_min, self.x_span, self.z_span] {
            ctx.put16(v as u16);
        }
        ctx.put32(self.flags);
    }
}

impl Layout for WaterBox {
    const SIZE: u32 = 0x10;
}

impl FromData for WaterBox {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        let x_min = c.read()?;
        let y_surface = c.read()?;
        let z_min = c.read()?;
        let x_span = c.read()?;
        let z_span = c.read()?;
        c.skip(2);
        Ok(Self {
            x_min,
            y_surface,
            z_min,
            x_span,
            z_span,
            flags: c.read()?,
        })
    }
}

fn read_list<T>(
    segment_table: &SegmentTable<'_>,
    ptr: SegmentAddr,
    len: u32,
) -> Result<Vec<T>, ReadError>
where
    T: FromData + Layout,
{
    if ptr.is_null() || len == 0 {
        Ok(vec![])
    } else {
        Slice::new(ptr, len).read_all(segment_table)
    }
}

fn write_vec3s(ctx: &mut WriteContext, values: &[[i16; 3]]) -> SegmentAddr {
    ctx.push(2);
    for value in values {
        for &v in value {
            ctx.put16(v as u16);
        }
    }
    ctx.pop()
}

impl CollisionHeader {
    pub const SIZE: u32 = 0x2c;

    pub fn parse(segment_table: &SegmentTable<'_>, addr: SegmentAddr) -> Result<Self, ReadError> {
        let data = segment_table.get(addr.segment())?;
        let mut c = Cursor::new(data, addr.offset());
        let min = c.read()?;
        let max = c.read()?;
        let num_vertices: u16 = c.read()?;
        c.skip(2);
        let vertices_ptr: SegmentAddr = c.read()?;
        let num_triangles: u16 = c.read()?;
        c.skip(2);
        let triangles_ptr: SegmentAddr = c.read()?;
        let triangle_types_ptr: SegmentAddr = c.read()?;
        let camera_data_ptr: SegmentAddr = c.read()?;
        let num_water_boxes: u16 = c.read()?;
        c.skip(2);
        let water_boxes_ptr: SegmentAddr = c.read()?;

        let vertices = read_list(segment_table, vertices_ptr, num_vertices as u32)?;
        let triangles: Vec<Triangle> =
            read_list(segment_table, triangles_ptr, num_triangles as u32)?;
        let triangle_types = read_list(
            segment_table,
            triangle_types_ptr,
            infer_triangle_type_count(&triangles),
        )?;
        let water_boxes = read_list(segment_table, water_boxes_ptr, num_water_boxes as u32)?;

        let camera_count = infer_camera_count(&triangle_types, &water_boxes);
        let cameras = match camera_data_ptr.non_null().filter(|_| camera_count > 0) {
            Some(ptr) => {
                let count = camera_count;
                let data = segment_table.get(ptr.segment())?;
                let cameras = (0..count)
                    .map(|i| CameraData::parse(segment_table, data, ptr.offset() + i * 8))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(cameras)
            }
            None => None,
        };

        Ok(Self {
            min,
            max,
            vertices,
            triangles,
            triangle_types,
            cameras,
            water_boxes,
        })
    }

    /// Highest exit index referenced by a surface type. Exit indices count from 1.
    pub fn num_exits(&self) -> u32 {
        self.triangle_types
            .iter()
            .map(|t| t.exit_index())
            .max()
            .unwrap_or(0)
    }

    pub fn write(&self, ctx: &mut WriteContext) -> SegmentAddr {
        ctx.push(4);

        let vertices = write_vec3s(ctx, &self.vertices);

        ctx.push(4);
        for t in &self.triangles {
            ctx.put16(t.type_);
            ctx.put16(t.vertex_a_and_flags);
            ctx.put16(t.vertex_b_and_flags);
            ctx.put16(t.vertex_c_and_flags);
            for &n in &t.normal {
                ctx.put16(n as u16);
            }
            ctx.put16(t.dist as u16);
        }
        let triangles = ctx.pop();

        ctx.push(4);
        for t in &self.triangle_types {
            ctx.put32(t.high_value);
            ctx.put32(t.low_value);
        }
        let triangle_types = ctx.pop();

        let cameras = match &self.cameras {
            Some(cameras) if !cameras.is_empty() => {
                ctx.push(4);
                for camera in cameras {
                    camera.write(ctx);
                }
                ctx.pop()
            }
            _ => SegmentAddr::NULL,
        };

        ctx.push(4);
        for water_box in &self.water_boxes {
            water_box.write(ctx);
        }
        let water_boxes = ctx.pop();

        for &v in self.min.iter().chain(self.max.iter()) {
            ctx.put16(v as u16);
        }
        ctx.put16(self.vertices.len() as u16);
        ctx.put_addr(vertices);
        ctx.put16(self.triangles.len() as u16);
        ctx.put_addr(triangles);
        ctx.put_addr(triangle_types);
        ctx.put_addr(cameras);
        ctx.put16(self.water_boxes.len() as u16);
        ctx.put_addr(water_boxes);
        ctx.pop()
    }
}

pub fn infer_triangle_type_count(triangles: &[Triangle]) -> u32 {
    triangles.iter().map(|t| t.type_).fold(0, u16::max) as u32 + 1
}

/// One more than the highest camera index used by a surface type or water box.
pub fn infer_camera_count(triangle_types: &[TriangleType], water_boxes: &[WaterBox]) -> u32 {
    triangle_types
        .iter()
        .map(|t| t.camera_index())
        .chain(water_boxes.iter().map(|w| w.camera_index()))
        .filter(|&index| index != NO_CAMERA)
        .max()
        .map_or(0, |max| max + 1)
}
