use std::iter;
use z64scene_datablob::{
    trim_overlaps, BlobRef, BlobSegments, DataBlobList, DataBlobSubtype, DataBlobType,
    MAX_BLOB_SIZE,
};
use z64scene_read::OwnedFile;
use z64scene_segment::{Segment, SegmentAddr};
use z64scene_write::WriteContext;

use crate::collision::CollisionHeader;
use crate::header_common::{header_size, parse_headers, write_alternate_table, write_commands};
use crate::header_scene::{SceneCollision, SceneHeader, SceneWriteEnv};
use crate::relocate::{patch_refs, write_blobs};
use crate::room::Room;
use crate::{BlobLookup, Game, ParseContext, SceneError};

/// File id of the scene file. Rooms count up from 1.
const SCENE_FILE: u16 = 0;

/// A scene file, its rooms, and the blobs they refer to.
#[derive(Clone)]
pub struct Scene {
    pub game: Game,
    pub file: OwnedFile,
    /// The main header followed by its alternates.
    pub headers: Vec<SceneHeader>,
    /// Shared by every header that has a collision command.
    pub collision: Option<CollisionHeader>,
    pub blobs: DataBlobList,
    pub rooms: Vec<Room>,
}

/// Serialized scene and room files, rooms in load order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SceneFiles {
    pub scene: Vec<u8>,
    pub rooms: Vec<Vec<u8>>,
}

impl Scene {
    /// Parses a scene and its rooms, in room list order.
    ///
    /// Blobs that room display lists find in the scene file belong to the scene.
    pub fn parse(game: Game, file: OwnedFile, rooms: Vec<OwnedFile>) -> Result<Scene, SceneError> {
        let (headers, collision, blobs, parsed_rooms) = {
            let mut ctx = ParseContext::new(game);
            ctx.segments.setup_segment(
                Segment::SCENE,
                file.borrow(),
                DataBlobList::for_file(Segment::SCENE, SCENE_FILE),
            );
            let mut collision = SceneCollision::default();
            let headers: Vec<SceneHeader> = parse_headers(
                &mut ctx,
                SegmentAddr::new(Segment::SCENE, 0),
                &mut collision,
            )?;

            let mut parsed_rooms = Vec::with_capacity(rooms.len());
            for (i, room) in rooms.iter().enumerate() {
                let (headers, mut blobs) = Room::parse_in(&mut ctx, room.borrow(), i as u16 + 1)?;
                trim_overlaps(iter::once(&mut blobs))?;
                parsed_rooms.push((headers, blobs));
            }

            let textures: Vec<SegmentAddr> = headers
                .iter()
                .flat_map(SceneHeader::flipbook_textures)
                .collect();
            register_flipbooks(&mut ctx.segments, textures);

            let mut blobs = ctx
                .segments
                .take(Segment::SCENE)
                .unwrap_or_else(|| DataBlobList::for_file(Segment::SCENE, SCENE_FILE));
            trim_overlaps(iter::once(&mut blobs))?;
            (headers, collision.header, blobs, parsed_rooms)
        };

        log::info!(
            "parsed {} scene: {} headers, {} blobs, {} rooms",
            game,
            headers.len(),
            blobs.len(),
            parsed_rooms.len()
        );
        let rooms = rooms
            .into_iter()
            .zip(parsed_rooms)
            .map(|(file, (headers, blobs))| Room {
                file,
                headers,
                blobs,
            })
            .collect();
        Ok(Scene {
            game,
            file,
            headers,
            collision,
            blobs,
            rooms,
        })
    }

    pub fn main_header(&self) -> Option<&SceneHeader> {
        self.headers.first()
    }

    /// Number of rooms the main header lists.
    pub fn num_rooms(&self) -> usize {
        self.main_header()
            .and_then(|header| header.room_list.as_ref())
            .map_or(0, Vec::len)
    }

    /// Serializes the scene, then every room.
    pub fn write(&mut self) -> Result<SceneFiles, SceneError> {
        let scene = self.write_scene()?;
        let game = self.game;
        let scene_blobs = &self.blobs;
        let rooms = self
            .rooms
            .iter_mut()
            .map(|room| room.write(game, Some(scene_blobs)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SceneFiles { scene, rooms })
    }

    fn write_scene(&mut self) -> Result<Vec<u8>, SceneError> {
        let mut ctx = WriteContext::new(Segment::SCENE);
        ctx.ready();

        let blank = SceneHeader::default();
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
        patch_refs(&mut ctx, SCENE_FILE, &self.blobs, &[&self.blobs]);

        let collision = match &self.collision {
            Some(collision) => collision.write(&mut ctx),
            None => SegmentAddr::NULL,
        };
        let env = SceneWriteEnv {
            game: self.game,
            collision,
            num_exits: self.collision.as_ref().map_or(0, CollisionHeader::num_exits),
            lookup: BlobLookup::new(vec![&self.blobs]),
        };

        let alternates: Vec<SegmentAddr> = alternates
            .iter()
            .map(|header| {
                if header.is_blank {
                    return SegmentAddr::NULL;
                }
                ctx.push(8);
                let commands = header.write_payloads(&mut ctx, &env);
                write_commands(&mut ctx, None, &header.unhandled_commands, commands);
                ctx.pop()
            })
            .collect();

        ctx.push(8);
        let commands = main.write_payloads(&mut ctx, &env);
        let table = write_alternate_table(&mut ctx, &alternates);
        write_commands(&mut ctx, table, &main.unhandled_commands, commands);
        ctx.pop_first_header();

        let out = ctx.finish();
        log::info!(
            "wrote {} scene: 0x{:x} bytes, {} headers",
            self.game,
            out.len(),
            self.headers.len()
        );
        Ok(out)
    }
}

/// Marks the textures that texture animations cycle through.
///
/// A texture already found through a display list keeps its size. Any other texture is sized up
/// to the next cycled texture in the same segment; overlap trimming shortens the guess where
/// other blobs follow sooner.
fn register_flipbooks(segments: &mut BlobSegments<'_>, mut textures: Vec<SegmentAddr>) {
    textures.sort_unstable();
    textures.dedup();
    let same_segment = |pair: &[SegmentAddr]| pair[0].segment() == pair[1].segment();
    let gaps: Vec<Option<u32>> = textures
        .windows(2)
        .map(|pair| Some(pair[1].0 - pair[0].0).filter(|_| same_segment(pair)))
        .collect();
    let min_gap = gaps.iter().flatten().copied().min().unwrap_or(MAX_BLOB_SIZE);

    for (i, &addr) in textures.iter().enumerate() {
        let existing = segments
            .list_mut(addr.segment())
            .and_then(|list| list.find_mut(addr))
            .filter(|blob| blob.kind == DataBlobType::Texture);
        if let Some(blob) = existing {
            blob.subtype = DataBlobSubtype::Flipbook;
            blob.add_ref(BlobRef::Entity);
            continue;
        }
        let size = gaps.get(i).copied().flatten().unwrap_or(min_gap);
        match segments.push(addr, size, DataBlobType::Texture, BlobRef::Entity) {
            Some(blob) => blob.subtype = DataBlobSubtype::Flipbook,
            None => log::debug!("flipbook texture {:?} is outside the loaded files", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_scene::Entrance;

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect()
    }

    fn parse(game: Game, scene: Vec<u8>, rooms: Vec<Vec<u8>>) -> Result<Scene, SceneError> {
        let rooms = rooms.into_iter().map(OwnedFile::from).collect();
        Scene::parse(game, OwnedFile::from(scene), rooms)
    }

    fn round_trip(scene: &mut Scene) -> SceneFiles {
        let first = scene.write().unwrap();
        let mut reparsed = parse(scene.game, first.scene.clone(), first.rooms.clone()).unwrap();
        let second = reparsed.write().unwrap();
        assert_eq!(first, second);
        second
    }

    #[test]
    fn room_list_only() {
        let data = words(&[0x0401_0000, 0x0200_0008, 0x1400_0000, 0]);
        let mut scene = parse(Game::Oot, data, vec![]).unwrap();
        assert_eq!(scene.num_rooms(), 1);
        assert!(scene.headers[0].unhandled_commands.is_empty());

        let out = round_trip(&mut scene);
        assert_eq!(
            out.scene,
            words(&[0x0401_0000, 0x0200_0010, 0x1400_0000, 0, 0x1400_0000, 0])
        );
    }

    #[test]
    fn alternate_table_is_padded_to_three() {
        let data = words(&[
            0x1801_0000,
            0x0200_0018,
            0x0701_0000,
            0x0000_0003,
            0x1400_0000,
            0,
            // 0x18: one declared alternate
            0x0200_0020,
            0,
            // 0x20
            0x1500_0000,
            0x0000_0001,
            0x1400_0000,
            0,
        ]);
        let mut scene = parse(Game::Oot, data, vec![]).unwrap();
        assert_eq!(scene.headers.len(), 2);
        assert_eq!(scene.headers[1].unhandled_commands, vec![[0x1500_0000, 1]]);

        let out = round_trip(&mut scene);
        assert_eq!(
            out.scene,
            words(&[
                0x1803_0000,
                0x0200_0028,
                0x0701_0000,
                0x0000_0003,
                0x1400_0000,
                0,
                // 0x18: alternate header
                0x1500_0000,
                0x0000_0001,
                0x1400_0000,
                0,
                // 0x28: table
                0x0200_0018,
                0,
                0,
            ])
        );
    }

    #[test]
    fn fatal_errors_fail_the_parse() {
        let data = words(&[0x0701_0000, 2, 0x0701_0000, 2, 0x1400_0000, 0]);
        assert!(matches!(
            parse(Game::Oot, data, vec![]),
            Err(SceneError::DuplicateSpecialObjects(_))
        ));

        // the alternate redeclares collision elsewhere
        let data = words(&[
            0x1801_0000,
            0x0200_0018,
            0x0300_0000,
            0x0200_0030,
            0x1400_0000,
            0,
            // 0x18: table
            0x0200_0020,
            0,
            // 0x20
            0x1500_0000,
            0,
            0x0300_0000,
            0x0200_0060,
            0x1400_0000,
            0,
            // 0x30: empty collision header
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ]);
        assert!(matches!(
            parse(Game::Oot, data, vec![]),
            Err(SceneError::CollisionMismatch { .. })
        ));
    }

    #[test]
    fn rooms_patch_pointers_into_the_scene() {
        let scene = words(&[
            0x0401_0000,
            0x0200_0010,
            0x1400_0000,
            0,
            // 0x10: room list
            0,
            0x100,
            // 0x18: display list called by the room
            0xdf00_0000,
            0,
        ]);
        let room = words(&[
            0x0a00_0000,
            0x0300_0010,
            0x1400_0000,
            0,
            // 0x10: simple mesh
            0x0001_0000,
            0x0300_001c,
            0x0300_0024,
            // 0x1c: entry
            0x0300_0028,
            0,
            0,
            // 0x28: calls the scene's display list
            0xde00_0000,
            0x0200_0018,
            0xdf00_0000,
            0,
        ]);
        let mut scene = parse(Game::Oot, scene, vec![room]).unwrap();
        assert_eq!(scene.rooms.len(), 1);
        let called = scene.blobs.find(SegmentAddr(0x0200_0018)).unwrap();
        assert_eq!(called.kind, DataBlobType::Mesh);
        assert!(called.refs().iter().any(|r| matches!(
            r,
            BlobRef::Word {
                segment: Segment::ROOM,
                file: 1,
                ..
            }
        )));

        let out = round_trip(&mut scene);
        // the scene's display list is written right after the main header
        assert_eq!(&out.scene[0x10..0x18], &words(&[0xdf00_0000, 0])[..]);
        // the room's display list lands after its header and calls the new address
        assert_eq!(
            &out.rooms[0][0x10..0x20],
            &words(&[0xde00_0000, 0x0200_0010, 0xdf00_0000, 0])[..]
        );
    }

    #[test]
    fn overlapping_display_lists_are_all_patched() {
        let scene = words(&[0x0401_0000, 0x0200_0010, 0x1400_0000, 0, 0, 0x90]);
        let mut room = words(&[
            0x0a00_0000,
            0x0300_0010,
            0x1400_0000,
            0,
            // 0x10: simple mesh
            0x0001_0000,
            0x0300_001c,
            0x0300_0024,
            // 0x1c: entry
            0x0300_0040,
            0,
        ]);
        room.resize(0x40, 0);
        room.extend(words(&[
            // 0x40: calls its own tail at 0x48
            0xde00_0000,
            0x0300_0048,
            0x0100_1002,
            0x0300_0080,
            0xdf00_0000,
            0,
        ]));
        room.resize(0x80, 0);
        room.extend(words(&[0x1111_1111; 4]));

        let mut scene = parse(Game::Oot, scene, vec![room]).unwrap();
        let blobs = &scene.rooms[0].blobs;
        assert_eq!(blobs.find(SegmentAddr(0x0300_0040)).unwrap().size, 0x18);
        assert_eq!(blobs.find(SegmentAddr(0x0300_0048)).unwrap().size, 0x10);

        let out = round_trip(&mut scene);
        let vertices = scene.rooms[0]
            .blobs
            .updated_addr(SegmentAddr(0x0300_0080))
            .unwrap();
        let room = &out.rooms[0];
        let vtx_pointers: Vec<&[u8]> = room
            .chunks(8)
            .filter(|command| command[..4] == [0x01, 0x00, 0x10, 0x02])
            .map(|command| &command[4..])
            .collect();
        assert_eq!(vtx_pointers.len(), 2);
        for pointer in vtx_pointers {
            assert_eq!(pointer, &vertices.0.to_be_bytes()[..]);
        }
        assert!((vertices.offset() as usize) < room.len());
    }

    fn at(file: &mut Vec<u8>, offset: usize, data: &[u32]) {
        assert!(file.len() <= offset);
        file.resize(offset, 0);
        file.extend(words(data));
    }

    #[test]
    fn full_scene_round_trips_without_growing() {
        let mut scene_data = vec![];
        at(
            &mut scene_data,
            0,
            &[
                0x1803_0000,
                0x0200_0300,
                0x0001_0000,
                0x0200_0080,
                0x0600_0000,
                0x0200_00a0,
                0x0401_0000,
                0x0200_00b0,
                0x0300_0000,
                0x0200_0200,
                // exit count comes from the collision
                0x1300_0000,
                0x0200_00c0,
                0x0d00_0000,
                0x0200_00d0,
                0x0f01_0000,
                0x0200_00e0,
                0x1400_0000,
                0,
            ],
        );
        // spawn
        at(&mut scene_data, 0x80, &[0x0000_0001, 0x0002_0003, 0, 0x0000_0fff]);
        // entrance
        at(&mut scene_data, 0xa0, &[0]);
        // room list
        at(&mut scene_data, 0xb0, &[0, 0x1c0]);
        // exits
        at(&mut scene_data, 0xc0, &[0x0001_0002, 0x0003_0000]);
        // one path and the empty entry that ends the list
        at(&mut scene_data, 0xd0, &[0x0200_0000, 0x0200_00f8, 0, 0]);
        // light
        at(
            &mut scene_data,
            0xe0,
            &[0x1020_3040, 0x5060_7080, 0x90a0_b0c0, 0xd0e0_f001, 0x0203_0405],
        );
        scene_data.extend_from_slice(&[0x06, 0x07]);
        // path points
        at(&mut scene_data, 0xf8, &[0x0001_0002, 0x0003_fffc, 0xfffb_fffa]);
        // collision header
        at(
            &mut scene_data,
            0x200,
            &[
                0xfff6_ffec,
                0xffe2_000a,
                0x0014_001e,
                0x0002_0000,
                0x0200_0230,
                0x0001_0000,
                0x0200_0240,
                0x0200_0250,
                0x0200_0260,
                0x0001_0000,
                0x0200_0270,
            ],
        );
        at(&mut scene_data, 0x230, &[0x0001_0002, 0x0003_0004, 0x0005_0006]);
        at(
            &mut scene_data,
            0x240,
            &[0x0001_2000, 0x2001_0000, 0x0000_7fff, 0x0000_ffc0],
        );
        // the second surface type leads to exit 3
        at(&mut scene_data, 0x250, &[0, 0, 0x0000_0300, 0]);
        at(
            &mut scene_data,
            0x260,
            &[0x001e_0001, 0x0200_0268, 0x0007_0008, 0x0009_0000],
        );
        at(
            &mut scene_data,
            0x270,
            &[0, 0x0000_0064, 0x0064_0000, 0x0000_00ff],
        );
        // alternate header sharing the collision
        at(
            &mut scene_data,
            0x2c0,
            &[0x1500_0000, 1, 0x0300_0000, 0x0200_0200, 0x1400_0000, 0],
        );
        // alternate table
        at(&mut scene_data, 0x300, &[0x0200_02c0, 0, 0]);

        let mut room = vec![];
        at(
            &mut room,
            0,
            &[
                0x0a00_0000,
                0x0300_0010,
                0x1400_0000,
                0,
                // 0x10: simple mesh
                0x0001_0000,
                0x0300_001c,
                0x0300_0024,
                // 0x1c: entry
                0x0300_0040,
                0,
            ],
        );
        at(
            &mut room,
            0x40,
            &[
                0xfd10_0000,
                0x0300_0100,
                0xf510_0000,
                0,
                0xf200_0000,
                0x0001_c01c,
                0x0100_4008,
                0x0300_0180,
                0xdf00_0000,
                0,
            ],
        );
        at(&mut room, 0x100, &[0x2222_2222; 0x20]);
        at(&mut room, 0x180, &[0x3333_3333; 0x10]);

        let mut scene = parse(Game::Oot, scene_data.clone(), vec![room.clone()]).unwrap();
        assert_eq!(scene.headers.len(), 2);
        assert!(scene.headers[1].has_collision);
        let main = &scene.headers[0];
        assert_eq!(main.exits, Some(vec![1, 2, 3]));
        assert_eq!(main.entrances, Some(vec![Entrance { spawn: 0, room: 0 }]));
        assert_eq!(main.paths.as_ref().map(Vec::len), Some(1));
        assert_eq!(main.lights.as_ref().map(Vec::len), Some(1));
        let blobs = &scene.rooms[0].blobs;
        let texture = blobs.find(SegmentAddr(0x0300_0100)).unwrap();
        assert_eq!((texture.kind, texture.size), (DataBlobType::Texture, 0x80));
        let vertices = blobs.find(SegmentAddr(0x0300_0180)).unwrap();
        assert_eq!((vertices.kind, vertices.size), (DataBlobType::Vertex, 0x40));

        let out = round_trip(&mut scene);
        assert!(out.scene.len() <= scene_data.len());
        assert!(out.rooms[0].len() <= room.len());

        let reparsed = parse(Game::Oot, out.scene.clone(), out.rooms.clone()).unwrap();
        assert_eq!(reparsed.headers.len(), 2);
        assert_eq!(reparsed.collision, scene.collision);
        let (before, after) = (&scene.headers[0], &reparsed.headers[0]);
        assert_eq!(after.spawns, before.spawns);
        assert_eq!(after.entrances, before.entrances);
        assert_eq!(after.exits, before.exits);
        assert_eq!(after.paths, before.paths);
        assert_eq!(after.lights, before.lights);
        assert_eq!(reparsed.headers[1].unhandled_commands, vec![[0x1500_0000, 1]]);

        // the exit list is written without a count
        let exits = out.scene[..]
            .chunks(8)
            .take_while(|command| command[0] != 0x14)
            .find(|command| command[0] == 0x13)
            .unwrap();
        assert_eq!(exits[1], 0);
    }

    #[test]
    fn cycled_textures_become_flipbooks() {
        let scene = words(&[0; 0x10]);
        let mut segments = BlobSegments::new();
        segments.setup_segment(
            Segment::SCENE,
            &scene,
            DataBlobList::for_file(Segment::SCENE, SCENE_FILE),
        );
        segments.push(
            SegmentAddr(0x0200_0000),
            0x8,
            DataBlobType::Texture,
            BlobRef::Entity,
        );
        register_flipbooks(
            &mut segments,
            vec![
                SegmentAddr(0x0200_0020),
                SegmentAddr(0x0200_0000),
                SegmentAddr(0x0200_0010),
                SegmentAddr(0x0200_0020),
                SegmentAddr(0x0600_0000),
            ],
        );

        let list = segments.take(Segment::SCENE).unwrap();
        assert_eq!(list.len(), 3);
        let sizes: Vec<(u32, u32, DataBlobSubtype)> = [0x0200_0000, 0x0200_0010, 0x0200_0020]
            .iter()
            .map(|&addr| {
                let blob = list.find(SegmentAddr(addr)).unwrap();
                (addr, blob.size, blob.subtype)
            })
            .collect();
        assert_eq!(
            sizes,
            vec![
                (0x0200_0000, 0x8, DataBlobSubtype::Flipbook),
                (0x0200_0010, 0x10, DataBlobSubtype::Flipbook),
                (0x0200_0020, 0x10, DataBlobSubtype::Flipbook),
            ]
        );
    }
}
