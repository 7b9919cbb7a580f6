use std::iter;
use z64scene_datablob::{trim_overlaps, DataBlobList};
use z64scene_read::OwnedFile;
use z64scene_segment::{Segment, SegmentAddr};
use z64scene_write::WriteContext;

use crate::header_common::{header_size, parse_headers, write_alternate_table, write_commands};
use crate::header_room::RoomHeader;
use crate::relocate::{patch_refs, write_blobs};
use crate::{BlobLookup, Game, ParseContext, SceneError};

/// File id of a room parsed without its scene.
const STANDALONE_FILE: u16 = 1;

/// A room file with its headers and the blobs they refer to.
#[derive(Clone)]
pub struct Room {
    pub file: OwnedFile,
    /// The main header followed by its alternates.
    pub headers: Vec<RoomHeader>,
    pub blobs: DataBlobList,
}

impl Room {
    /// Parses a room on its own. Pointers into the scene are left alone.
    pub fn parse(game: Game, file: OwnedFile) -> Result<Room, SceneError> {
        let (headers, mut blobs) = {
            let mut ctx = ParseContext::new(game);
            Self::parse_in(&mut ctx, file.borrow(), STANDALONE_FILE)?
        };
        trim_overlaps(iter::once(&mut blobs))?;
        Ok(Room {
            file,
            headers,
            blobs,
        })
    }

    /// Parses a room mapped into a context that may also have the scene set up. Blobs found in the
    /// scene go to the scene's list.
    pub(crate) fn parse_in<'a>(
        ctx: &mut ParseContext<'a>,
        data: &'a [u8],
        file: u16,
    ) -> Result<(Vec<RoomHeader>, DataBlobList), SceneError> {
        ctx.segments
            .setup_segment(Segment::ROOM, data, DataBlobList::for_file(Segment::ROOM, file));
        let headers = parse_headers(ctx, SegmentAddr::new(Segment::ROOM, 0), &mut ())?;
        let blobs = ctx
            .segments
            .take(Segment::ROOM)
            .unwrap_or_else(|| DataBlobList::for_file(Segment::ROOM, file));
        log::debug!(
            "room file {}: {} headers, {} blobs",
            file,
            headers.len(),
            blobs.len()
        );
        Ok((headers, blobs))
    }

    pub fn main_header(&self) -> Option<&RoomHeader> {
        self.headers.first()
    }

    /// Serializes the room. `scene_blobs` must already have been written, so that pointers into
    /// the scene can be rewritten to where the scene's blobs landed.
    pub fn write(
        &mut self,
        game: Game,
        scene_blobs: Option<&DataBlobList>,
    ) -> Result<Vec<u8>, SceneError> {
        let mut ctx = WriteContext::new(Segment::ROOM);
        ctx.ready();

        let blank = RoomHeader::default();
        let (main, alternates) = match self.headers.split_first() {
            Some(split) => split,
            None => (&blank, &[][..]),
        };
        ctx.reserve_first_header(header_size(
            !alternates.is_empty(),
            main.unhandled_commands.len(),
            main.handled_count(),
        ));

        write_blobs(&mut ctx, &mut self.blobs, self.file.borrow())?;
        let targets: Vec<&DataBlobList> =
            scene_blobs.into_iter().chain(Some(&self.blobs)).collect();
        patch_refs(&mut ctx, self.blobs.file(), &self.blobs, &targets);
        let lookup = BlobLookup::new(targets);

        let alternates: Vec<SegmentAddr> = alternates
            .iter()
            .map(|header| {
                if header.is_blank {
                    return SegmentAddr::NULL;
                }
                ctx.push(8);
                let commands = header.write_payloads(&mut ctx, game, &lookup);
                write_commands(&mut ctx, None, &header.unhandled_commands, commands);
                ctx.pop()
            })
            .collect();

        ctx.push(8);
        let commands = main.write_payloads(&mut ctx, game, &lookup);
        let table = write_alternate_table(&mut ctx, &alternates);
        write_commands(&mut ctx, table, &main.unhandled_commands, commands);
        ctx.pop_first_header();

        let out = ctx.finish();
        log::info!(
            "wrote room file {}: 0x{:x} bytes, {} headers",
            self.blobs.file(),
            out.len(),
            self.headers.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::RoomMesh;

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect()
    }

    fn room() -> Vec<u8> {
        words(&[
            0x1600_0000,
            0x0000_0002,
            0x0a00_0000,
            0x0300_0020,
            0x1400_0000,
            0,
            0,
            0,
            // 0x20: simple mesh, one entry
            0x0001_0000,
            0x0300_002c,
            0x0300_0034,
            // 0x2c: entry
            0x0300_0038,
            0,
            0,
            // 0x38: display list
            0xdf00_0000,
            0,
        ])
    }

    fn opaque(room: &Room) -> SegmentAddr {
        match room.headers[0].mesh {
            Some(RoomMesh::Simple(ref entries)) => entries[0].opaque,
            ref mesh => panic!("unexpected mesh {:?}", mesh),
        }
    }

    #[test]
    fn write_relocates_display_lists() {
        let mut room = Room::parse(Game::Oot, OwnedFile::from(room())).unwrap();
        assert_eq!(opaque(&room), SegmentAddr(0x0300_0038));

        let out = room.write(Game::Oot, None).unwrap();
        // header: 0x16, 0x0a, end
        assert_eq!(&out[..8], &words(&[0x1600_0000, 2])[..]);
        assert_eq!(&out[0x18..0x20], &words(&[0xdf00_0000, 0])[..]);

        let mut reparsed = Room::parse(Game::Oot, OwnedFile::from(out.clone())).unwrap();
        assert_eq!(opaque(&reparsed), SegmentAddr(0x0300_0018));
        assert_eq!(reparsed.write(Game::Oot, None).unwrap(), out);
    }

    #[test]
    fn dead_blobs_are_dropped() {
        let mut room = Room::parse(Game::Oot, OwnedFile::from(room())).unwrap();
        room.headers[0].mesh = None;
        for blob in room.blobs.iter_mut() {
            blob.clear_refs();
        }
        let out = room.write(Game::Oot, None).unwrap();
        assert_eq!(out, words(&[0x1600_0000, 2, 0x1400_0000, 0]));
    }
}
