//! The 8-byte command stream shared by scene and room headers, and the alternate header table.

use z64scene_read::{Cursor, FromData, Layout, ReadError, Slice};
use z64scene_segment::{Segment, SegmentAddr, SegmentTable};
use z64scene_write::WriteContext;

use crate::{ParseContext, SceneError};

pub const END: u8 = 0x14;
pub const ALTERNATE_HEADERS: u8 = 0x18;

/// Opcodes above this do not occur in headers.
pub const MAX_OPCODE: u8 = 0x1f;

/// The alternate header table is never written with fewer entries than this, and is read with
/// this many entries when its command gives no count.
pub const MIN_ALTERNATE_HEADERS: usize = 3;

const COMMAND_SIZE: u32 = 8;

/// One header command: `u8 opcode, u8 count, u16 unused, u32 data`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Command {
    pub words: [u32; 2],
}

impl Command {
    pub fn new(opcode: u8, count: u8, data: u32) -> Self {
        Self {
            words: [u32::from(opcode) << 24 | u32::from(count) << 16, data],
        }
    }

    pub fn opcode(self) -> u8 {
        (self.words[0] >> 24) as u8
    }

    /// The second byte, an element count for most commands.
    pub fn count(self) -> u8 {
        (self.words[0] >> 16) as u8
    }

    pub fn data(self) -> u32 {
        self.words[1]
    }

    pub fn addr(self) -> SegmentAddr {
        SegmentAddr(self.words[1])
    }

    pub fn write(self, ctx: &mut WriteContext) {
        ctx.put32(self.words[0]);
        ctx.put32(self.words[1]);
    }
}

impl Layout for Command {
    const SIZE: u32 = COMMAND_SIZE;
}

impl FromData for Command {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        let mut c = Cursor::new(data, offset);
        Ok(Self {
            words: [c.read()?, c.read()?],
        })
    }
}

/// Whether `addr` can start a header in `segment`: it must lie inside the segment's buffer and be
/// 8-byte aligned.
pub fn is_likely_header(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
    segment: Segment,
) -> bool {
    addr.segment() == segment
        && addr.is_aligned(8)
        && segment_table
            .get(segment)
            .map_or(false, |data| (addr.offset() as usize) < data.len())
}

/// Reads the commands of the header at `addr`, up to but not including the end command.
///
/// Outside the main header an opcode above [`MAX_OPCODE`] means the address was not a header after
/// all.
pub fn read_commands(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
    segment: Segment,
    root: bool,
) -> Result<Vec<Command>, SceneError> {
    if !is_likely_header(segment_table, addr, segment) {
        return Err(SceneError::UnlikelyHeader(addr));
    }
    let data = segment_table.get(segment)?;
    let mut commands = vec![];
    let mut offset = addr.offset();
    loop {
        let command = match Command::from_data(data, offset) {
            Ok(command) => command,
            Err(ReadError::OutOfRange { .. }) => return Err(SceneError::Unterminated(addr)),
            Err(e) => return Err(e.into()),
        };
        let opcode = command.opcode();
        if opcode == END {
            log::debug!("header {:?}: {} commands", addr, commands.len());
            return Ok(commands);
        }
        if !root && opcode > MAX_OPCODE {
            return Err(SceneError::NotAHeader { addr, opcode });
        }
        log::trace!(
            "0x{:06x}: {:08x} {:08x}",
            offset,
            command.words[0],
            command.words[1]
        );
        commands.push(command);
        offset += COMMAND_SIZE;
    }
}

fn starts_with_opcode(data: &[u8], addr: SegmentAddr, segment: Segment, opcode: u8) -> bool {
    addr.segment() == segment
        && addr.is_aligned(8)
        && data.get(addr.offset() as usize) == Some(&opcode)
}

/// Reads the alternate header table that `command` points at. Blank slots are `None`.
///
/// The command's count byte gives the number of entries, or [`MIN_ALTERNATE_HEADERS`] when it is
/// zero. Some files list more headers than they declare, so the table is read further while each
/// word is zero or points at a command with `first_opcode`. Trailing blank slots are kept.
pub fn read_alternate_table(
    segment_table: &SegmentTable<'_>,
    command: Command,
    segment: Segment,
    first_opcode: u8,
) -> Vec<Option<SegmentAddr>> {
    let table = command.addr();
    let data = match segment_table.get(segment) {
        Ok(data) if table.segment() == segment => data,
        _ => {
            log::warn!("alternate header table {:?} is not in {:?}", table, segment);
            return vec![];
        }
    };
    let declared = match command.count() {
        0 => MIN_ALTERNATE_HEADERS,
        count => count as usize,
    };

    let mut c = Cursor::new(data, table.offset());
    let mut entries = vec![];
    while let Ok(addr) = c.read::<SegmentAddr>() {
        if entries.len() < declared || addr.is_null() {
            entries.push(addr.non_null());
        } else if starts_with_opcode(data, addr, segment, first_opcode) {
            log::debug!("found undeclared alternate header {:?}", addr);
            entries.push(Some(addr));
        } else {
            break;
        }
    }
    entries
}

/// A scene or room header.
pub(crate) trait Header: Sized {
    /// Segment the file is mapped to.
    const SEGMENT: Segment;
    /// The command alternate headers start with.
    const FIRST_OPCODE: u8;

    /// What the headers of one file share.
    type State;

    fn blank() -> Self;

    fn is_blank(&self) -> bool;

    /// Interprets a header's commands, registering the blobs its payloads refer to.
    fn parse(
        ctx: &mut ParseContext<'_>,
        addr: SegmentAddr,
        commands: &[Command],
        state: &mut Self::State,
    ) -> Result<Self, SceneError>;
}

/// Parses the main header at `addr` followed by its alternate headers.
///
/// Alternate headers that cannot be read become blank, unless the error makes the whole file
/// unusable. Trailing blank headers are dropped.
pub(crate) fn parse_headers<H: Header>(
    ctx: &mut ParseContext<'_>,
    addr: SegmentAddr,
    state: &mut H::State,
) -> Result<Vec<H>, SceneError> {
    let commands = read_commands(ctx.segment_table(), addr, H::SEGMENT, true)?;
    let mut headers = vec![H::parse(ctx, addr, &commands, state)?];

    let table = commands
        .iter()
        .copied()
        .find(|command| command.opcode() == ALTERNATE_HEADERS);
    if let Some(table) = table {
        let entries =
            read_alternate_table(ctx.segment_table(), table, H::SEGMENT, H::FIRST_OPCODE);
        for entry in entries {
            let header = match entry {
                Some(alternate) => match parse_alternate::<H>(ctx, alternate, state) {
                    Ok(header) => header,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        log::warn!("rejected alternate header {:?}: {}", alternate, e);
                        H::blank()
                    }
                },
                None => H::blank(),
            };
            headers.push(header);
        }
    }

    while headers.len() > 1 && headers.last().map_or(false, H::is_blank) {
        headers.pop();
    }
    Ok(headers)
}

fn parse_alternate<H: Header>(
    ctx: &mut ParseContext<'_>,
    addr: SegmentAddr,
    state: &mut H::State,
) -> Result<H, SceneError> {
    let commands = read_commands(ctx.segment_table(), addr, H::SEGMENT, false)?;
    H::parse(ctx, addr, &commands, state)
}

/// Size of a header with the given numbers of commands, including the end command.
pub(crate) fn header_size(alternates: bool, unhandled: usize, handled: usize) -> u32 {
    (alternates as u32 + unhandled as u32 + handled as u32 + 1) * COMMAND_SIZE
}

/// Writes the alternate header table, padded with null entries to [`MIN_ALTERNATE_HEADERS`], and
/// returns the command that refers to it. Returns `None` if there are no alternate headers.
pub(crate) fn write_alternate_table(
    ctx: &mut WriteContext,
    alternates: &[SegmentAddr],
) -> Option<Command> {
    if alternates.is_empty() {
        return None;
    }
    let len = alternates.len().max(MIN_ALTERNATE_HEADERS);
    ctx.push(4);
    for i in 0..len {
        ctx.put_addr(alternates.get(i).copied().unwrap_or(SegmentAddr::NULL));
    }
    let table = ctx.pop();
    Some(Command::new(ALTERNATE_HEADERS, len as u8, table.0))
}

/// Writes a header's commands into the current blob: the alternate table, unhandled commands in
/// their original order, handled commands by opcode, then the end command.
pub(crate) fn write_commands(
    ctx: &mut WriteContext,
    alternates: Option<Command>,
    unhandled: &[[u32; 2]],
    mut handled: Vec<Command>,
) {
    handled.sort_by_key(|command| command.opcode());
    let unhandled = unhandled.iter().map(|&words| Command { words });
    for command in alternates.into_iter().chain(unhandled).chain(handled) {
        command.write(ctx);
    }
    Command::new(END, 0, 0).write(ctx);
}

/// Reads `count` consecutive values, without touching `addr` when there are none.
pub(crate) fn read_array<T: FromData + Layout>(
    segment_table: &SegmentTable<'_>,
    addr: SegmentAddr,
    count: u32,
) -> Result<Vec<T>, ReadError> {
    Slice::new(addr, count).read_all(segment_table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect()
    }

    #[test]
    fn read_commands_stops_at_end() {
        let data = words(&[0x0401_0000, 0x0200_0010, 0x1400_0000, 0, 0xffff_ffff, 0]);
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let commands =
            read_commands(&table, SegmentAddr(0x0200_0000), Segment::SCENE, true).unwrap();
        assert_eq!(commands, vec![Command::new(0x04, 1, 0x0200_0010)]);
        assert_eq!(commands[0].count(), 1);
    }

    #[test]
    fn read_commands_rejects_non_headers() {
        let data = words(&[0x1500_0000, 0, 0x4000_0000, 0, 0x1400_0000, 0]);
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let read = |addr, root| read_commands(&table, SegmentAddr(addr), Segment::SCENE, root);

        assert!(read(0x0200_0000, true).is_ok());
        assert!(matches!(
            read(0x0200_0000, false),
            Err(SceneError::NotAHeader { opcode: 0x40, .. })
        ));
        assert!(matches!(read(0x0200_0004, false), Err(SceneError::UnlikelyHeader(_))));
        assert!(matches!(read(0x0300_0000, false), Err(SceneError::UnlikelyHeader(_))));
        assert!(matches!(read(0x0200_0018, false), Err(SceneError::UnlikelyHeader(_))));
        assert!(matches!(read(0x0200_0010, false), Ok(ref c) if c.is_empty()));
    }

    #[test]
    fn unterminated_header() {
        let data = words(&[0x1500_0000, 0]);
        let mut table = SegmentTable::new();
        table.set(Segment::ROOM, &data);
        assert!(matches!(
            read_commands(&table, SegmentAddr(0x0300_0000), Segment::ROOM, true),
            Err(SceneError::Unterminated(_))
        ));
    }

    #[test]
    fn alternate_table_scans_past_declared_count() {
        let data = words(&[
            // 0x00: table declaring one entry
            0x0200_0020,
            0,
            0x0200_0028,
            // stops here, the target starts with a room command
            0x0200_0030,
            0x0200_0018,
            0,
            0,
            0,
            // 0x20
            0x1500_0000,
            0,
            0x1500_0000,
            0,
            0x1600_0000,
            0,
        ]);
        let mut table = SegmentTable::new();
        table.set(Segment::SCENE, &data);
        let entries = read_alternate_table(
            &table,
            Command::new(ALTERNATE_HEADERS, 1, 0x0200_0000),
            Segment::SCENE,
            0x15,
        );
        assert_eq!(
            entries,
            vec![
                Some(SegmentAddr(0x0200_0020)),
                None,
                Some(SegmentAddr(0x0200_0028)),
            ]
        );
    }

    #[test]
    fn alternate_table_is_padded() {
        let mut ctx = WriteContext::new(Segment::SCENE);
        let command = write_alternate_table(&mut ctx, &[SegmentAddr(0x0200_0040)]).unwrap();
        assert_eq!(command.opcode(), ALTERNATE_HEADERS);
        assert_eq!(command.count(), 3);
        assert_eq!(ctx.finish(), words(&[0x0200_0040, 0, 0]));
        assert!(write_alternate_table(&mut WriteContext::new(Segment::SCENE), &[]).is_none());
    }

    #[test]
    fn command_order() {
        let mut ctx = WriteContext::new(Segment::ROOM);
        ctx.push(8);
        write_commands(
            &mut ctx,
            Some(Command::new(ALTERNATE_HEADERS, 3, 0x0300_0100)),
            &[[0x1600_0000, 0x0000_0001], [0x0800_0000, 0]],
            vec![Command::new(0x0b, 1, 0x0300_0200), Command::new(0x01, 2, 0x0300_0300)],
        );
        ctx.pop();
        let out = ctx.finish();
        let opcodes: Vec<u8> = out.chunks(8).map(|c| c[0]).collect();
        assert_eq!(opcodes, vec![0x18, 0x16, 0x08, 0x01, 0x0b, 0x14]);
        assert_eq!(header_size(true, 2, 2), 0x30);
    }
}
