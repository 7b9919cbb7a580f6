//! Room mesh headers (room command 0x0A).

use z64scene_datablob::{discover_display_list, BlobRef, BlobSegments, DataBlobType};
use z64scene_read::{Cursor, ReadError};
use z64scene_segment::{SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

use crate::BlobLookup;

const SIMPLE: u8 = 0x00;
const JFIF: u8 = 0x01;
const CLIPPED: u8 = 0x02;

const JFIF_SINGLE: u8 = 0x01;
const JFIF_MULTIPLE: u8 = 0x02;

const MULTIPLE_JFIF_ENTRY_SIZE: u32 = 0x1c;

const JPEG_EOI: [u8; 2] = [0xff, 0xd9];

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MeshEntry {
    pub opaque: SegmentAddr,
    pub translucent: SegmentAddr,
}

impl MeshEntry {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            opaque: c.read()?,
            translucent: c.read()?,
        })
    }

    fn write(&self, ctx: &mut WriteContext, lookup: &BlobLookup<'_>) {
        ctx.put_addr(lookup.relocate(self.opaque));
        ctx.put_addr(lookup.relocate(self.translucent));
    }
}

/// A mesh entry the game draws only when its bounding sphere is in view.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ClippedMeshEntry {
    pub center: [i16; 3],
    pub radius: i16,
    pub entry: MeshEntry,
}

/// A prerendered background image, optionally with a palette.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Background {
    pub source: SegmentAddr,
    pub unk_0c: u32,
    pub tlut: SegmentAddr,
    pub width: u16,
    pub height: u16,
    pub fmt: u8,
    pub siz: u8,
    pub tlut_mode: u16,
    pub tlut_count: u16,
}

impl Background {
    fn read(c: &mut Cursor<'_>) -> Result<Self, ReadError> {
        let background = Self {
            source: c.read()?,
            unk_0c: c.read()?,
            tlut: c.read()?,
            width: c.read()?,
            height: c.read()?,
            fmt: c.read()?,
            siz: c.read()?,
            tlut_mode: c.read()?,
            tlut_count: c.read()?,
        };
        c.skip(2);
        Ok(background)
    }

    fn write(&self, ctx: &mut WriteContext, lookup: &BlobLookup<'_>) {
        ctx.put_addr(lookup.relocate(self.source));
        ctx.put32(self.unk_0c);
        ctx.put_addr(lookup.relocate(self.tlut));
        ctx.put16(self.width);
        ctx.put16(self.height);
        ctx.put8(self.fmt);
        ctx.put8(self.siz);
        ctx.put16(self.tlut_mode);
        ctx.put16(self.tlut_count);
        ctx.put16(0);
    }

    fn register_blobs(&self, segments: &mut BlobSegments<'_>) {
        if let Ok(data) = segments.segment_table().get(self.source.segment()) {
            let size = jpeg_size(data, self.source.offset());
            segments.push(self.source, size, DataBlobType::Texture, BlobRef::Entity);
        }
        segments.push(
            self.tlut,
            u32::from(self.tlut_count) * 2,
            DataBlobType::Palette,
            BlobRef::Entity,
        );
    }
}

/// Size of a JPEG stream through its end-of-image marker, or to the end of `data` if there is
/// none.
fn jpeg_size(data: &[u8], offset: u32) -> u32 {
    let tail = data.get(offset as usize..).unwrap_or(&[]);
    tail.windows(JPEG_EOI.len())
        .position(|w| w == &JPEG_EOI[..])
        .map_or(tail.len(), |pos| pos + JPEG_EOI.len()) as u32
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MultipleJfifEntry {
    pub unk_00: u16,
    pub id: u8,
    pub background: Background,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum JfifMesh {
    Single {
        entry: MeshEntry,
        background: Background,
    },
    Multiple {
        entry: MeshEntry,
        backgrounds: Vec<MultipleJfifEntry>,
    },
}

impl JfifMesh {
    pub fn entry(&self) -> &MeshEntry {
        match self {
            JfifMesh::Single { entry, .. } | JfifMesh::Multiple { entry, .. } => entry,
        }
    }

    pub fn backgrounds(&self) -> impl Iterator<Item = &Background> + '_ {
        let (single, multiple) = match self {
            JfifMesh::Single { background, .. } => (Some(background), &[][..]),
            JfifMesh::Multiple { backgrounds, .. } => (None, &backgrounds[..]),
        };
        single
            .into_iter()
            .chain(multiple.iter().map(|entry| &entry.background))
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RoomMesh {
    Simple(Vec<MeshEntry>),
    Jfif(JfifMesh),
    Clipped(Vec<ClippedMeshEntry>),
}

fn cursor_at<'a>(
    segment_table: &SegmentTable<'a>,
    addr: SegmentAddr,
) -> Result<Cursor<'a>, ReadError> {
    Ok(Cursor::new(segment_table.get(addr.segment())?, addr.offset()))
}

impl RoomMesh {
    /// Reads a mesh header. Returns `None` for mesh types this crate does not know.
    pub fn parse(
        segment_table: &SegmentTable<'_>,
        addr: SegmentAddr,
    ) -> Result<Option<RoomMesh>, ReadError> {
        let mut c = cursor_at(segment_table, addr)?;
        let type_: u8 = c.read()?;
        let byte1: u8 = c.read()?;
        c.skip(2);
        let mesh = match type_ {
            SIMPLE | CLIPPED => {
                let start: SegmentAddr = c.read()?;
                let mut entries = match start.non_null() {
                    Some(start) => cursor_at(segment_table, start)?,
                    None => Cursor::new(&[], 0),
                };
                if type_ == SIMPLE {
                    RoomMesh::Simple(
                        (0..byte1)
                            .map(|_| MeshEntry::read(&mut entries))
                            .collect::<Result<_, _>>()?,
                    )
                } else {
                    RoomMesh::Clipped(
                        (0..byte1)
                            .map(|_| -> Result<_, ReadError> {
                                Ok(ClippedMeshEntry {
                                    center: entries.read()?,
                                    radius: entries.read()?,
                                    entry: MeshEntry::read(&mut entries)?,
                                })
                            })
                            .collect::<Result<_, _>>()?,
                    )
                }
            }
            JFIF => {
                let entry_addr: SegmentAddr = c.read()?;
                let entry = MeshEntry::read(&mut cursor_at(segment_table, entry_addr)?)?;
                match byte1 {
                    JFIF_SINGLE => RoomMesh::Jfif(JfifMesh::Single {
                        entry,
                        background: Background::read(&mut c)?,
                    }),
                    JFIF_MULTIPLE => {
                        let count: u8 = c.read()?;
                        c.skip(3);
                        let list: SegmentAddr = c.read()?;
                        let mut backgrounds = Vec::with_capacity(count as usize);
                        for i in 0..count as u32 {
                            let mut e = cursor_at(
                                segment_table,
                                SegmentAddr(list.0 + i * MULTIPLE_JFIF_ENTRY_SIZE),
                            )?;
                            let unk_00 = e.read()?;
                            let id = e.read()?;
                            e.skip(1);
                            backgrounds.push(MultipleJfifEntry {
                                unk_00,
                                id,
                                background: Background::read(&mut e)?,
                            });
                        }
                        RoomMesh::Jfif(JfifMesh::Multiple { entry, backgrounds })
                    }
                    _ => {
                        log::warn!("unknown prerendered mesh kind {} at {:?}", byte1, addr);
                        return Ok(None);
                    }
                }
            }
            _ => {
                log::warn!("unknown mesh type {} at {:?}", type_, addr);
                return Ok(None);
            }
        };
        Ok(Some(mesh))
    }

    pub fn entries(&self) -> Vec<MeshEntry> {
        match self {
            RoomMesh::Simple(entries) => entries.clone(),
            RoomMesh::Jfif(jfif) => vec![*jfif.entry()],
            RoomMesh::Clipped(entries) => entries.iter().map(|e| e.entry).collect(),
        }
    }

    /// Registers every display list, background image and palette the mesh refers to.
    pub fn register_blobs(&self, segments: &mut BlobSegments<'_>) {
        for entry in self.entries() {
            for &dl in &[entry.opaque, entry.translucent] {
                discover_display_list(segments, dl, BlobRef::Entity);
            }
        }
        if let RoomMesh::Jfif(jfif) = self {
            for background in jfif.backgrounds() {
                background.register_blobs(segments);
            }
        }
    }

    pub fn write(&self, ctx: &mut WriteContext, lookup: &BlobLookup<'_>) -> SegmentAddr {
        ctx.push(4);
        match self {
            RoomMesh::Simple(entries) => {
                ctx.push(4);
                for entry in entries {
                    entry.write(ctx, lookup);
                }
                let start = ctx.pop();
                write_list_header(ctx, SIMPLE, entries.len(), start, 8);
            }
            RoomMesh::Clipped(entries) => {
                ctx.push(4);
                for e in entries {
                    for &v in &e.center {
                        ctx.put16(v as u16);
                    }
                    ctx.put16(e.radius as u16);
                    e.entry.write(ctx, lookup);
                }
                let start = ctx.pop();
                write_list_header(ctx, CLIPPED, entries.len(), start, 0x10);
            }
            RoomMesh::Jfif(jfif) => {
                ctx.push(4);
                jfif.entry().write(ctx, lookup);
                let entry = ctx.pop();
                match jfif {
                    JfifMesh::Single { background, .. } => {
                        ctx.put8(JFIF);
                        ctx.put8(JFIF_SINGLE);
                        ctx.put_addr(entry);
                        background.write(ctx, lookup);
                    }
                    JfifMesh::Multiple { backgrounds, .. } => {
                        ctx.push(4);
                        for e in backgrounds {
                            ctx.put_exactly_size(MULTIPLE_JFIF_ENTRY_SIZE);
                            ctx.put16(e.unk_00);
                            ctx.put8(e.id);
                            e.background.write(ctx, lookup);
                            ctx.end_exactly_size();
                        }
                        let list = ctx.pop();
                        ctx.put8(JFIF);
                        ctx.put8(JFIF_MULTIPLE);
                        ctx.put_addr(entry);
                        ctx.put8(backgrounds.len() as u8);
                        ctx.put_addr(list);
                    }
                }
            }
        }
        ctx.pop()
    }
}

fn write_list_header(
    ctx: &mut WriteContext,
    type_: u8,
    count: usize,
    start: SegmentAddr,
    entry_size: u32,
) {
    ctx.put8(type_);
    ctx.put8(count as u8);
    ctx.put_addr(start);
    ctx.put_addr(
        start
            .non_null()
            .map_or(SegmentAddr::NULL, |start| SegmentAddr(start.0 + count as u32 * entry_size)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use z64scene_datablob::DataBlobList;
    use z64scene_segment::Segment;

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect()
    }

    #[test]
    fn simple_mesh_registers_display_lists() {
        let mut data = words(&[
            0x0000_0000, 0x0300_000c, // 0x00: simple header, count patched below
            0x0300_0014, // 0x08: end
            0x0300_0018, 0x0000_0000, // 0x0c: entry
            0x0000_0000, // 0x14: pad
            0xdf00_0000, 0x0000_0000, // 0x18: display list
        ]);
        data[1] = 1;

        let mut segments = BlobSegments::new();
        segments.setup_segment(Segment::ROOM, &data, DataBlobList::for_file(Segment::ROOM, 1));
        let mesh = RoomMesh::parse(segments.segment_table(), SegmentAddr(0x0300_0000))
            .unwrap()
            .unwrap();
        assert_eq!(
            mesh,
            RoomMesh::Simple(vec![MeshEntry {
                opaque: SegmentAddr(0x0300_0018),
                translucent: SegmentAddr::NULL,
            }])
        );

        mesh.register_blobs(&mut segments);
        let list = segments.take(Segment::ROOM).unwrap();
        let dl = list.find(SegmentAddr(0x0300_0018)).unwrap();
        assert_eq!(dl.kind, DataBlobType::Mesh);
        assert_eq!(dl.size, 8);
        assert_eq!(dl.refs(), &[BlobRef::Entity]);
    }

    #[test]
    fn background_runs_through_end_of_image() {
        let data = [0x00, 0xff, 0xd8, 0x12, 0xff, 0xd9, 0x00, 0x00];
        assert_eq!(jpeg_size(&data, 1), 5);
        assert_eq!(jpeg_size(&data[..5], 1), 4);
        assert_eq!(jpeg_size(&data, 9), 0);
    }

    #[test]
    fn written_multiple_jfif_reads_back() {
        let background = Background {
            source: SegmentAddr(0x0300_0100),
            unk_0c: 0,
            tlut: SegmentAddr::NULL,
            width: 320,
            height: 240,
            fmt: 2,
            siz: 2,
            tlut_mode: 0,
            tlut_count: 0,
        };
        let mesh = RoomMesh::Jfif(JfifMesh::Multiple {
            entry: MeshEntry {
                opaque: SegmentAddr(0x0300_0200),
                translucent: SegmentAddr::NULL,
            },
            backgrounds: vec![
                MultipleJfifEntry {
                    unk_00: 0x0082,
                    id: 0,
                    background,
                },
                MultipleJfifEntry {
                    unk_00: 0x0082,
                    id: 1,
                    background: Background {
                        source: SegmentAddr(0x0300_0180),
                        ..background
                    },
                },
            ],
        });

        let lookup = BlobLookup::new(vec![]);
        let mut ctx = WriteContext::new(Segment::ROOM);
        let addr = mesh.write(&mut ctx, &lookup);
        let out = ctx.finish();
        let mut table = SegmentTable::new();
        table.set(Segment::ROOM, &out);
        assert_eq!(RoomMesh::parse(&table, addr).unwrap(), Some(mesh));
    }

    #[test]
    fn unknown_mesh_type_is_not_parsed() {
        let data = words(&[0x0300_0000, 0x0300_0000]);
        let mut table = SegmentTable::new();
        table.set(Segment::ROOM, &data);
        assert_eq!(RoomMesh::parse(&table, SegmentAddr(0x0300_0000)).unwrap(), None);
    }
}
