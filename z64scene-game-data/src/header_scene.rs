use z64scene_read::{Cursor, FromData, Layout, ReadError};
use z64scene_segment::{Segment, SegmentAddr};
use z64scene_write::WriteContext;

use crate::actor_cutscene::{
    parse_actor_cutscene_cameras, parse_actor_cutscenes, write_actor_cutscene_cameras,
    write_actor_cutscenes, ActorCutscene, ActorCutsceneCamera,
};
use crate::collision::CollisionHeader;
use crate::cutscene::{CutsceneListMm, CutsceneOot};
use crate::header_common::{read_array, Command, Header, ALTERNATE_HEADERS};
use crate::instance::{parse_instances, Instance, InstanceTab};
use crate::light::Light;
use crate::path::{parse_paths, write_paths, Path};
use crate::texanim::{parse_animated_materials, write_animated_materials, AnimatedMaterial};
use crate::{BlobLookup, Game, ParseContext, SceneError};

pub const SPAWN_POSITIONS: u8 = 0x00;
pub const ACTOR_CUTSCENE_CAMERAS: u8 = 0x02;
pub const COLLISION: u8 = 0x03;
pub const ROOM_LIST: u8 = 0x04;
pub const ENTRANCES: u8 = 0x06;
pub const SPECIAL_OBJECTS: u8 = 0x07;
pub const PATHS: u8 = 0x0d;
pub const DOORWAYS: u8 = 0x0e;
pub const LIGHTS: u8 = 0x0f;
pub const EXITS: u8 = 0x13;
pub const SOUND: u8 = 0x15;
pub const CUTSCENES: u8 = 0x17;
pub const TEXTURE_ANIMATION: u8 = 0x1a;
pub const ACTOR_CUTSCENES: u8 = 0x1b;

/// Pairs a spawn position with the room it starts in.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Entrance {
    pub spawn: u8,
    pub room: u8,
}

impl Layout for Entrance {
    const SIZE: u32 = 2;
}

impl FromData for Entrance {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            spawn: c.read()?,
            room: c.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SpecialObjects {
    pub elf_message: u8,
    pub global_object: u16,
}

/// ROM range of one room file.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RoomListEntry {
    pub start: u32,
    pub end: u32,
}

impl Layout for RoomListEntry {
    const SIZE: u32 = 8;
}

impl FromData for RoomListEntry {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            start: c.read()?,
            end: c.read()?,
        })
    }
}

/// A transition actor, usually a door or loading plane between two rooms.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Doorway {
    pub front_room: u8,
    pub front_camera: u8,
    pub back_room: u8,
    pub back_camera: u8,
    pub id: u16,
    pub pos: [i16; 3],
    pub rot_y: u16,
    pub params: u16,
}

impl Layout for Doorway {
    const SIZE: u32 = 0x10;
}

impl FromData for Doorway {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            front_room: c.read()?,
            front_camera: c.read()?,
            back_room: c.read()?,
            back_camera: c.read()?,
            id: c.read()?,
            pos: c.read()?,
            rot_y: c.read()?,
            params: c.read()?,
        })
    }
}

impl Doorway {
    fn write(&self, ctx: &mut WriteContext) {
        ctx.put8(self.front_room);
        ctx.put8(self.front_camera);
        ctx.put8(self.back_room);
        ctx.put8(self.back_camera);
        ctx.put16(self.id);
        for &p in &self.pos {
            ctx.put16(p as u16);
        }
        ctx.put16(self.rot_y);
        ctx.put16(self.params);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneCutscenes {
    Oot(CutsceneOot),
    Mm(Vec<CutsceneListMm>),
}

/// The collision header every header of a scene shares.
#[derive(Clone, Debug, Default)]
pub struct SceneCollision {
    pub addr: SegmentAddr,
    pub header: Option<CollisionHeader>,
}

impl SceneCollision {
    fn num_exits(&self) -> u32 {
        self.header.as_ref().map_or(0, CollisionHeader::num_exits)
    }
}

/// One scene setup. Absent commands are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneHeader {
    pub spawns: Option<Vec<Instance>>,
    pub entrances: Option<Vec<Entrance>>,
    pub special_objects: Option<SpecialObjects>,
    pub room_list: Option<Vec<RoomListEntry>>,
    pub lights: Option<Vec<Light>>,
    /// Whether this header declares the scene's collision header.
    pub has_collision: bool,
    pub paths: Option<Vec<Path>>,
    pub doorways: Option<Vec<Doorway>>,
    pub cutscene: Option<SceneCutscenes>,
    pub exits: Option<Vec<u16>>,
    pub texture_animation: Option<Vec<AnimatedMaterial>>,
    pub actor_cutscenes: Option<Vec<ActorCutscene>>,
    pub actor_cutscene_cameras: Option<Vec<ActorCutsceneCamera>>,
    /// Commands kept verbatim.
    pub unhandled_commands: Vec<[u32; 2]>,
    /// An empty slot in the alternate header table.
    pub is_blank: bool,
}

/// Everything the headers of a scene share while being written.
pub(crate) struct SceneWriteEnv<'l> {
    pub game: Game,
    pub collision: SegmentAddr,
    pub num_exits: u32,
    pub lookup: BlobLookup<'l>,
}

impl SceneHeader {
    /// Reads one command. Returns whether the command was understood.
    fn parse_command(
        &mut self,
        ctx: &ParseContext<'_>,
        command: Command,
        collision: &SceneCollision,
    ) -> Result<bool, SceneError> {
        let game = ctx.game;
        let table = ctx.segment_table();
        let addr = command.addr();
        let count = u32::from(command.count());
        match command.opcode() {
            SPAWN_POSITIONS => {
                let spawns = match count {
                    0 => vec![],
                    _ => {
                        let data = table.get(addr.segment())?;
                        parse_instances(data, addr.offset(), count, game, InstanceTab::Spawn)?
                    }
                };
                self.spawns = Some(spawns);
            }
            ROOM_LIST => self.room_list = Some(read_array(table, addr, count)?),
            SPECIAL_OBJECTS => {
                self.special_objects = Some(SpecialObjects {
                    elf_message: command.count(),
                    global_object: command.data() as u16,
                })
            }
            PATHS => self.paths = Some(parse_paths(table, addr, Segment::SCENE)),
            DOORWAYS => self.doorways = Some(read_array(table, addr, count)?),
            LIGHTS => self.lights = Some(read_array(table, addr, count)?),
            EXITS => {
                let count = match count {
                    0 => collision.num_exits(),
                    count => count,
                };
                self.exits = Some(read_array(table, addr, count)?);
            }
            CUTSCENES => {
                self.cutscene = Some(match game {
                    Game::Oot => SceneCutscenes::Oot(CutsceneOot::parse_at(table, addr)?),
                    Game::Mm => {
                        SceneCutscenes::Mm(CutsceneListMm::parse(table, addr, command.count())?)
                    }
                })
            }
            TEXTURE_ANIMATION if game == Game::Mm => {
                self.texture_animation = Some(parse_animated_materials(table, addr)?)
            }
            ACTOR_CUTSCENES if game == Game::Mm => {
                self.actor_cutscenes = Some(parse_actor_cutscenes(table, addr, command.count())?)
            }
            ACTOR_CUTSCENE_CAMERAS if game == Game::Mm => {
                self.actor_cutscene_cameras =
                    Some(parse_actor_cutscene_cameras(table, addr, command.count())?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Number of handled commands [`write_payloads`](SceneHeader::write_payloads) returns.
    pub(crate) fn handled_count(&self) -> usize {
        [
            self.spawns.is_some(),
            self.entrances.is_some(),
            self.special_objects.is_some(),
            self.room_list.is_some(),
            self.lights.is_some(),
            self.has_collision,
            self.paths.is_some(),
            self.doorways.is_some(),
            self.cutscene.is_some(),
            self.exits.is_some(),
            self.texture_animation.is_some(),
            self.actor_cutscenes.is_some(),
            self.actor_cutscene_cameras.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count()
    }

    /// Writes every payload and returns the commands that refer to them.
    pub(crate) fn write_payloads(
        &self,
        ctx: &mut WriteContext,
        env: &SceneWriteEnv<'_>,
    ) -> Vec<Command> {
        let mut commands = vec![];
        if let Some(spawns) = &self.spawns {
            ctx.push(4);
            for spawn in spawns {
                spawn.write(ctx, env.game);
            }
            commands.push(Command::new(SPAWN_POSITIONS, spawns.len() as u8, ctx.pop().0));
        }
        if let Some(entrances) = &self.entrances {
            ctx.push(2);
            for entrance in entrances {
                ctx.put8(entrance.spawn);
                ctx.put8(entrance.room);
            }
            commands.push(Command::new(ENTRANCES, 0, ctx.pop().0));
        }
        if let Some(special) = self.special_objects {
            commands.push(Command::new(
                SPECIAL_OBJECTS,
                special.elf_message,
                u32::from(special.global_object),
            ));
        }
        if let Some(rooms) = &self.room_list {
            ctx.push(4);
            for room in rooms {
                ctx.put32(room.start);
                ctx.put32(room.end);
            }
            commands.push(Command::new(ROOM_LIST, rooms.len() as u8, ctx.pop_unique().0));
        }
        if let Some(lights) = &self.lights {
            ctx.push(4);
            for light in lights {
                light.write(ctx);
            }
            commands.push(Command::new(LIGHTS, lights.len() as u8, ctx.pop().0));
        }
        if self.has_collision {
            commands.push(Command::new(COLLISION, 0, env.collision.0));
        }
        if let Some(paths) = &self.paths {
            commands.push(Command::new(PATHS, 0, write_paths(ctx, paths).0));
        }
        if let Some(doorways) = &self.doorways {
            ctx.push(4);
            for doorway in doorways {
                doorway.write(ctx);
            }
            commands.push(Command::new(DOORWAYS, doorways.len() as u8, ctx.pop().0));
        }
        if let Some(exits) = &self.exits {
            ctx.push(2);
            for &exit in exits {
                ctx.put16(exit);
            }
            let addr = ctx.pop();
            let count = if exits.len() as u32 == env.num_exits {
                0
            } else {
                exits.len() as u8
            };
            commands.push(Command::new(EXITS, count, addr.0));
        }
        match &self.cutscene {
            Some(SceneCutscenes::Oot(cutscene)) => {
                commands.push(Command::new(CUTSCENES, 0, cutscene.write(ctx).0));
            }
            Some(SceneCutscenes::Mm(list)) => {
                let addr = CutsceneListMm::write(ctx, list);
                commands.push(Command::new(CUTSCENES, list.len() as u8, addr.0));
            }
            None => (),
        }
        if let Some(materials) = &self.texture_animation {
            let addr = write_animated_materials(ctx, materials, &env.lookup);
            commands.push(Command::new(TEXTURE_ANIMATION, 0, addr.0));
        }
        if let Some(cutscenes) = &self.actor_cutscenes {
            let addr = write_actor_cutscenes(ctx, cutscenes);
            commands.push(Command::new(ACTOR_CUTSCENES, cutscenes.len() as u8, addr.0));
        }
        if let Some(cameras) = &self.actor_cutscene_cameras {
            let addr = write_actor_cutscene_cameras(ctx, cameras);
            commands.push(Command::new(ACTOR_CUTSCENE_CAMERAS, cameras.len() as u8, addr.0));
        }
        commands
    }

    /// Texture addresses cycled through by texture animations.
    pub fn flipbook_textures(&self) -> impl Iterator<Item = SegmentAddr> + '_ {
        use crate::texanim::AnimatedMaterialParams;

        self.texture_animation
            .iter()
            .flatten()
            .filter_map(|material| match &material.params {
                AnimatedMaterialParams::Cycle(cycle) => Some(cycle.textures.iter().copied()),
                _ => None,
            })
            .flatten()
    }
}

impl Header for SceneHeader {
    const SEGMENT: Segment = Segment::SCENE;
    const FIRST_OPCODE: u8 = SOUND;

    type State = SceneCollision;

    fn blank() -> Self {
        SceneHeader {
            is_blank: true,
            ..SceneHeader::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.is_blank
    }

    fn parse(
        ctx: &mut ParseContext<'_>,
        addr: SegmentAddr,
        commands: &[Command],
        collision: &mut SceneCollision,
    ) -> Result<Self, SceneError> {
        let mut header = SceneHeader::default();
        let mut unhandled = vec![];

        // Collision first, so an exit list without a count can use its exit count.
        for &command in commands.iter().filter(|c| c.opcode() == COLLISION) {
            let found = command.addr();
            if collision.addr.is_null() {
                match CollisionHeader::parse(ctx.segment_table(), found) {
                    Ok(parsed) => {
                        collision.addr = found;
                        collision.header = Some(parsed);
                    }
                    Err(e) => {
                        log::warn!("keeping unreadable collision {:?} verbatim: {}", found, e);
                        unhandled.push(command);
                        continue;
                    }
                }
            } else if collision.addr != found {
                return Err(SceneError::CollisionMismatch {
                    first: collision.addr,
                    found,
                });
            }
            header.has_collision = true;
        }

        let mut entrances = None;
        for &command in commands {
            match command.opcode() {
                COLLISION | ALTERNATE_HEADERS => continue,
                ENTRANCES => {
                    entrances = Some(command);
                    continue;
                }
                SPECIAL_OBJECTS if header.special_objects.is_some() => {
                    return Err(SceneError::DuplicateSpecialObjects(addr));
                }
                _ => (),
            }
            match header.parse_command(ctx, command, collision) {
                Ok(true) => (),
                Ok(false) => unhandled.push(command),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "keeping scene command {:08x} {:08x} verbatim: {}",
                        command.words[0],
                        command.words[1],
                        e
                    );
                    unhandled.push(command);
                }
            }
        }

        // One entrance per spawn position.
        if let Some(command) = entrances {
            let count = header.spawns.as_ref().map_or(0, Vec::len) as u32;
            match read_array(ctx.segment_table(), command.addr(), count) {
                Ok(list) => header.entrances = Some(list),
                Err(e) => {
                    log::warn!("keeping unreadable entrance list verbatim: {}", e);
                    unhandled.push(command);
                }
            }
        }

        // Keep the original order of everything left over.
        unhandled.sort_by_key(|u| commands.iter().position(|c| c == u));
        header.unhandled_commands = unhandled.into_iter().map(|c| c.words).collect();
        Ok(header)
    }
}
