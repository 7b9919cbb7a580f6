use std::collections::HashSet;
use z64scene_read::bytes_at;
use z64scene_segment::SegmentAddr;

use crate::gbi::{Instruction, TextureDepth, TextureFormat};
use crate::{BlobRef, BlobSegments, DataBlobType, TextureInfo};

const VTX_SIZE: u32 = 0x10;
const MTX_SIZE: u32 = 0x40;
const TILE_COUNT: usize = 8;

#[derive(Clone, Copy)]
struct Tile {
    format: TextureFormat,
    depth: TextureDepth,
}

#[derive(Clone, Copy)]
struct PendingImage {
    addr: SegmentAddr,
    word: BlobRef,
    tile: Tile,
}

struct Discovery<'s, 'a> {
    segments: &'s mut BlobSegments<'a>,
    visited: HashSet<SegmentAddr>,
    tiles: [Option<Tile>; TILE_COUNT],
    image: Option<PendingImage>,
    palette: Option<SegmentAddr>,
}

/// Registers every mesh, vertex, matrix, texture and palette blob reachable from a display list.
///
/// `r` is recorded as the consumer of the root display list. Commands that point into segments
/// without a blob list (such as `gameplay_keep`) are skipped, and a display list that runs off the
/// end of its buffer is cut short.
pub fn discover_display_list(segments: &mut BlobSegments<'_>, addr: SegmentAddr, r: BlobRef) {
    Discovery {
        segments,
        visited: HashSet::new(),
        tiles: [None; TILE_COUNT],
        image: None,
        palette: None,
    }
    .walk(addr, r);
}

impl<'s, 'a> Discovery<'s, 'a> {
    fn walk(&mut self, addr: SegmentAddr, r: BlobRef) {
        if addr.is_null() {
            return;
        }
        if !self.visited.insert(addr) {
            self.segments.add_ref(addr, r);
            return;
        }
        let segment_table = self.segments.segment_table();
        let (data, file) = match (
            segment_table.get(addr.segment()),
            self.segments.file(addr.segment()),
        ) {
            (Ok(data), Some(file)) => (data, file),
            _ => {
                log::trace!("not following display list {:?}", addr);
                return;
            }
        };

        let mut offset = addr.offset();
        loop {
            let bytes = match bytes_at(data, offset, Instruction::SIZE) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("display list {:?} is unterminated: {}", addr, e);
                    break;
                }
            };
            let word = BlobRef::Word {
                segment: addr.segment(),
                file,
                offset: offset + 4,
            };
            let instruction = Instruction::parse(bytes);
            offset += Instruction::SIZE;
            self.visit(instruction, word);
            if instruction.is_terminator() {
                break;
            }
        }

        let size = offset - addr.offset();
        if size > 0 {
            self.segments.push(addr, size, DataBlobType::Mesh, r);
        }
    }

    fn visit(&mut self, instruction: Instruction, word: BlobRef) {
        match instruction {
            Instruction::Vtx { count, ptr } => {
                self.segments
                    .push(ptr, count as u32 * VTX_SIZE, DataBlobType::Vertex, word);
            }
            Instruction::Mtx { ptr, .. } => {
                self.segments.push(ptr, MTX_SIZE, DataBlobType::Matrix, word);
            }
            Instruction::Dl { ptr, .. } => self.walk(ptr, word),
            Instruction::SetTimg {
                format, depth, ptr, ..
            } => {
                self.image = Some(PendingImage {
                    addr: ptr,
                    word,
                    tile: Tile { format, depth },
                });
            }
            Instruction::SetTile {
                format,
                depth,
                tile,
                ..
            } => {
                self.tiles[tile as usize] = Some(Tile { format, depth });
            }
            Instruction::SetTileSize {
                tile,
                width,
                height,
            } => {
                if let Some(image) = self.image.take() {
                    let tile = self.tiles[tile as usize].unwrap_or(image.tile);
                    let palette = match tile.format {
                        TextureFormat::Ci => self.palette,
                        _ => None,
                    };
                    let size = tile.depth.image_size(width, height);
                    if let Some(blob) =
                        self.segments
                            .push(image.addr, size, DataBlobType::Texture, image.word)
                    {
                        blob.texture = Some(TextureInfo {
                            format: tile.format,
                            depth: tile.depth,
                            width,
                            height,
                            palette,
                        });
                    }
                }
            }
            Instruction::LoadTlut { count, .. } => {
                if let Some(image) = self.image.take() {
                    self.segments
                        .push(image.addr, count as u32 * 2, DataBlobType::Palette, image.word);
                    self.palette = Some(image.addr);
                }
            }
            _ => (),
        }
    }
}
