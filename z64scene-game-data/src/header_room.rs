use z64scene_segment::{Segment, SegmentAddr};
use z64scene_write::WriteContext;

use crate::header_common::{read_array, Command, Header, ALTERNATE_HEADERS};
use crate::instance::{parse_instances, Instance, InstanceTab};
use crate::mesh::RoomMesh;
use crate::{BlobLookup, Game, ParseContext, SceneError};

pub const ACTOR_LIST: u8 = 0x01;
pub const WIND: u8 = 0x05;
pub const BEHAVIOR: u8 = 0x08;
pub const MESH: u8 = 0x0a;
pub const OBJECT_LIST: u8 = 0x0b;
pub const TIME: u8 = 0x10;
pub const SKYBOX: u8 = 0x12;
pub const SOUND: u8 = 0x16;

/// One room setup. Absent commands are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoomHeader {
    pub actors: Option<Vec<Instance>>,
    pub objects: Option<Vec<u16>>,
    pub mesh: Option<RoomMesh>,
    /// Commands kept verbatim.
    pub unhandled_commands: Vec<[u32; 2]>,
    /// An empty slot in the alternate header table.
    pub is_blank: bool,
}

impl RoomHeader {
    fn parse_command(
        &mut self,
        ctx: &mut ParseContext<'_>,
        command: Command,
    ) -> Result<bool, SceneError> {
        let addr = command.addr();
        let count = u32::from(command.count());
        match command.opcode() {
            ACTOR_LIST => {
                let actors = match count {
                    0 => vec![],
                    _ => {
                        let data = ctx.segment_table().get(addr.segment())?;
                        parse_instances(data, addr.offset(), count, ctx.game, InstanceTab::Actor)?
                    }
                };
                self.actors = Some(actors);
            }
            OBJECT_LIST => self.objects = Some(read_array(ctx.segment_table(), addr, count)?),
            MESH => match RoomMesh::parse(ctx.segment_table(), addr)? {
                Some(mesh) => {
                    mesh.register_blobs(&mut ctx.segments);
                    self.mesh = Some(mesh);
                }
                None => return Ok(false),
            },
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(crate) fn handled_count(&self) -> usize {
        [self.actors.is_some(), self.objects.is_some(), self.mesh.is_some()]
            .iter()
            .filter(|&&present| present)
            .count()
    }

    /// Writes every payload and returns the commands that refer to them.
    pub(crate) fn write_payloads(
        &self,
        ctx: &mut WriteContext,
        game: Game,
        lookup: &BlobLookup<'_>,
    ) -> Vec<Command> {
        let mut commands = vec![];
        if let Some(actors) = &self.actors {
            ctx.push(4);
            for actor in actors {
                actor.write(ctx, game);
            }
            commands.push(Command::new(ACTOR_LIST, actors.len() as u8, ctx.pop().0));
        }
        if let Some(mesh) = &self.mesh {
            commands.push(Command::new(MESH, 0, mesh.write(ctx, lookup).0));
        }
        if let Some(objects) = &self.objects {
            ctx.push(2);
            for &object in objects {
                ctx.put16(object);
            }
            commands.push(Command::new(OBJECT_LIST, objects.len() as u8, ctx.pop().0));
        }
        commands
    }
}

impl Header for RoomHeader {
    const SEGMENT: Segment = Segment::ROOM;
    const FIRST_OPCODE: u8 = SOUND;

    type State = ();

    fn blank() -> Self {
        RoomHeader {
            is_blank: true,
            ..RoomHeader::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.is_blank
    }

    fn parse(
        ctx: &mut ParseContext<'_>,
        addr: SegmentAddr,
        commands: &[Command],
        _: &mut (),
    ) -> Result<Self, SceneError> {
        let mut header = RoomHeader::default();
        for &command in commands {
            if command.opcode() == ALTERNATE_HEADERS {
                continue;
            }
            match header.parse_command(ctx, command) {
                Ok(true) => (),
                Ok(false) => header.unhandled_commands.push(command.words),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "room header {:?}: keeping {:08x} {:08x} verbatim: {}",
                        addr,
                        command.words[0],
                        command.words[1],
                        e
                    );
                    header.unhandled_commands.push(command.words);
                }
            }
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_common::parse_headers;
    use z64scene_datablob::{DataBlobList, DataBlobType};

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect()
    }

    fn parse(game: Game, data: &[u8]) -> Result<(Vec<RoomHeader>, DataBlobList), SceneError> {
        let mut ctx = ParseContext::new(game);
        ctx.segments
            .setup_segment(Segment::ROOM, data, DataBlobList::for_file(Segment::ROOM, 1));
        let headers = parse_headers(&mut ctx, SegmentAddr(0x0300_0000), &mut ())?;
        let list = ctx.segments.take(Segment::ROOM).unwrap();
        Ok((headers, list))
    }

    #[test]
    fn actors_objects_and_mesh() {
        let data = words(&[
            0x1600_0000,
            0x0000_0002,
            0x0101_0000,
            0x0300_0028,
            0x0a00_0000,
            0x0300_0038,
            0x0b02_0000,
            0x0300_0044,
            0x1400_0000,
            0,
            // 0x28: one actor
            0x0010_0001,
            0x0002_0003,
            0x0000_0000,
            0x0000_ffff,
            // 0x38: simple mesh, one entry
            0x0001_0000,
            0x0300_004c,
            0x0300_0054,
            // 0x44: objects
            0x0001_0002,
            0,
            // 0x4c: entry with an opaque display list
            0x0300_0054,
            0,
            // 0x54: display list
            0xdf00_0000,
            0,
        ]);
        let (headers, list) = parse(Game::Oot, &data).unwrap();
        assert_eq!(headers.len(), 1);
        let header = &headers[0];

        let actors = header.actors.as_ref().unwrap();
        assert_eq!(actors.len(), 1);
        assert_eq!(actors[0].id, 0x10);
        assert_eq!(actors[0].params, 0xffff);
        assert_eq!(header.objects, Some(vec![1, 2]));
        assert!(matches!(header.mesh, Some(RoomMesh::Simple(ref e)) if e.len() == 1));
        assert_eq!(header.unhandled_commands, vec![[0x1600_0000, 0x0000_0002]]);

        let dl = list.find(SegmentAddr(0x0300_0054)).unwrap();
        assert_eq!(dl.kind, DataBlobType::Mesh);
        assert_eq!(dl.size, 8);
    }

    #[test]
    fn blank_alternates_are_trimmed() {
        let data = words(&[
            0x1803_0000,
            0x0300_0010,
            0x1400_0000,
            0,
            // 0x10: table with one real alternate between blanks
            0,
            0x0300_0020,
            0,
            0,
            // 0x20
            0x1600_0000,
            0x0000_0001,
            0x1400_0000,
            0,
        ]);
        let (headers, _) = parse(Game::Oot, &data).unwrap();
        assert_eq!(headers.len(), 3);
        assert!(!headers[0].is_blank);
        assert!(headers[1].is_blank);
        assert_eq!(headers[2].unhandled_commands, vec![[0x1600_0000, 1]]);
    }

    #[test]
    fn rejected_alternate_becomes_blank() {
        let data = words(&[
            0x1802_0000,
            0x0300_0010,
            0x1400_0000,
            0,
            // 0x10: one alternate that is not a header, one that is
            0x0300_0018,
            0x0300_0020,
            // 0x18
            0x4000_0000,
            0,
            // 0x20
            0x1600_0000,
            0,
            0x1400_0000,
            0,
        ]);
        let (headers, _) = parse(Game::Oot, &data).unwrap();
        assert_eq!(headers.len(), 3);
        assert!(headers[1].is_blank);
        assert!(!headers[2].is_blank);
    }
}
