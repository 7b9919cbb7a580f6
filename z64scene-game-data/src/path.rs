use z64scene_read::{Cursor, ReadError, Slice};
use z64scene_segment::{Segment, SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

/// One path: a list of points with two per-path parameters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Path {
    /// Additional path index in MM, unused in OoT.
    pub extra: u8,
    pub custom: i16,
    pub points: Vec<[i16; 3]>,
}

const ENTRY_SIZE: u32 = 8;

impl Path {
    fn parse(
        segment_table: &SegmentTable<'_>,
        entry: SegmentAddr,
        segment: Segment,
    ) -> Result<Option<Path>, ReadError> {
        let data = segment_table.get(entry.segment())?;
        let mut c = Cursor::new(data, entry.offset());
        let count: u8 = c.read()?;
        let extra: u8 = c.read()?;
        let custom: i16 = c.read()?;
        let points: SegmentAddr = c.read()?;
        if count == 0 || points.segment() != segment {
            return Ok(None);
        }
        let points = Slice::<[i16; 3]>::new(points, count as u32).read_all(segment_table)?;
        Ok(Some(Path {
            extra,
            custom,
            points,
        }))
    }

    fn write_points(&self, ctx: &mut WriteContext) -> SegmentAddr {
        ctx.push(2);
        for point in &self.points {
            for &v in point {
                ctx.put16(v as u16);
            }
        }
        ctx.pop()
    }
}

/// Reads a path list. The list has no stored length, so it ends at the first entry with no
/// points, with points outside `segment`, or that cannot be read.
pub fn parse_paths(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
    segment: Segment,
) -> Vec<Path> {
    let mut paths = vec![];
    let mut entry = addr;
    loop {
        match Path::parse(segment_table, entry, segment) {
            Ok(Some(path)) => paths.push(path),
            Ok(None) => break,
            Err(e) => {
                log::debug!("path list at {:?} ends at {:?}: {}", addr, entry, e);
                break;
            }
        }
        entry = match entry.checked_add(ENTRY_SIZE) {
            Some(next) => next,
            None => break,
        };
    }
    paths
}

/// Writes a path list followed by an all-zero entry, which stops the reader at the same length.
pub fn write_paths(ctx: &mut WriteContext, paths: &[Path]) -> SegmentAddr {
    ctx.push(4);
    for path in paths {
        let points = path.write_points(ctx);
        ctx.put8(path.points.len() as u8);
        ctx.put8(path.extra);
        ctx.put16(path.custom as u16);
        ctx.put_addr(points);
    }
    ctx.put32(0);
    ctx.put32(0);
    ctx.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_paths() -> Vec<u8> {
        let mut data = vec![
            // 0x00: two paths, then an entry pointing outside the scene
            0x02, 0x00, 0x00, 0x05, 0x02, 0x00, 0x00, 0x20, //
            0x01, 0x03, 0xff, 0xff, 0x02, 0x00, 0x00, 0x2c, //
            0x04, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        // 0x20: points
        for v in &[1i16, 2, 3, 4, 5, 6, -7, -8, -9] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        data
    }

    #[test]
    fn list_ends_at_foreign_pointer() {
        let data = scene_with_paths();
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let paths = parse_paths(&table, SegmentAddr(0x0200_0000), Segment::SCENE);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].points, vec![[1, 2, 3], [4, 5, 6]]);
        assert_eq!(paths[0].custom, 5);
        assert_eq!(paths[1].extra, 3);
        assert_eq!(paths[1].custom, -1);
        assert_eq!(paths[1].points, vec![[-7, -8, -9]]);
    }

    #[test]
    fn written_list_reads_back() {
        let data = scene_with_paths();
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let paths = parse_paths(&table, SegmentAddr(0x0200_0000), Segment::SCENE);

        let mut ctx = WriteContext::new(Segment::SCENE);
        let addr = write_paths(&mut ctx, &paths);
        let out = ctx.finish();

        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &out);
        assert_eq!(parse_paths(&table, addr, Segment::SCENE), paths);
    }
}
