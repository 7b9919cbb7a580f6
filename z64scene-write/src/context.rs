use z64scene_datablob::DataBlobType;
use z64scene_segment::{Segment, SegmentAddr};

/// Deepest nesting of open blobs.
pub const WORKBLOB_STACK_SIZE: usize = 32;

/// An open blob. Its bytes are the tail of the scratch arena starting at `start`.
struct Frame {
    start: usize,
    align: u32,
    /// Open exactly-size regions as (frame-relative start, size).
    exactly: Vec<(usize, usize)>,
}

/// A range of the output that later identical blobs may reuse.
struct Written {
    kind: DataBlobType,
    offset: u32,
    len: u32,
}

/// Assembles one output file.
///
/// Payloads are built inside nested blobs. [`push`](WriteContext::push) opens a blob directly
/// after the bytes of the blob that is currently open, and [`pop`](WriteContext::pop) moves the
/// finished blob into the output file and returns its segment address. A parent blob can
/// therefore write the addresses of its children, which always land in the output first.
pub struct WriteContext {
    segment: Segment,
    output: Vec<u8>,
    scratch: Vec<u8>,
    stack: Vec<Frame>,
    written: Vec<Written>,
    first_header: Option<u32>,
}

impl WriteContext {
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            output: vec![],
            scratch: vec![],
            stack: Vec::with_capacity(WORKBLOB_STACK_SIZE),
            written: vec![],
            first_header: None,
        }
    }

    /// Discards all output and writer state.
    pub fn ready(&mut self) {
        self.output.clear();
        self.scratch.clear();
        self.stack.clear();
        self.written.clear();
        self.first_header = None;
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Output written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn finish(self) -> Vec<u8> {
        assert!(self.stack.is_empty(), "finished with open blobs");
        self.output
    }

    /// Opens a blob whose output address will be a multiple of `align`.
    ///
    /// # Panics
    ///
    /// Panics if [`WORKBLOB_STACK_SIZE`] blobs are already open or `align` is not a power of two.
    pub fn push(&mut self, align: u32) {
        assert!(
            self.stack.len() < WORKBLOB_STACK_SIZE,
            "workblob stack overflow"
        );
        assert!(align.is_power_of_two());
        self.stack.push(Frame {
            start: self.scratch.len(),
            align,
            exactly: vec![],
        });
    }

    /// Closes the current blob and appends it to the output, reusing an identical earlier blob
    /// if there is one. Returns the blob's address, or null if it is empty.
    ///
    /// # Panics
    ///
    /// Panics if no blob is open or an exactly-size region is still open.
    pub fn pop(&mut self) -> SegmentAddr {
        self.pop_frame(true)
    }

    /// Like [`pop`](WriteContext::pop), but always appends new bytes. For lists whose entries must
    /// stay distinct even when identical.
    pub fn pop_unique(&mut self) -> SegmentAddr {
        self.pop_frame(false)
    }

    fn pop_frame(&mut self, dedup: bool) -> SegmentAddr {
        let frame = self.stack.pop().expect("workblob stack underflow");
        assert!(frame.exactly.is_empty(), "unterminated exactly-size region");
        let bytes = self.scratch.split_off(frame.start);
        self.append_data_blob(&bytes, DataBlobType::Generic, frame.align, dedup)
    }

    fn top(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("write with no open blob")
    }

    /// Size of the current blob.
    ///
    /// # Panics
    ///
    /// Panics if no blob is open.
    pub fn len(&self) -> u32 {
        let frame = self.stack.last().expect("no open blob");
        (self.scratch.len() - frame.start) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pad_to(&mut self, align: usize) {
        let start = self.top().start;
        while (self.scratch.len() - start) % align != 0 {
            self.scratch.push(0);
        }
    }

    pub fn put8(&mut self, value: u8) {
        self.top();
        self.scratch.push(value);
    }

    pub fn put16(&mut self, value: u16) {
        self.pad_to(2);
        self.scratch.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put32(&mut self, value: u32) {
        self.pad_to(4);
        self.scratch.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_addr(&mut self, addr: SegmentAddr) {
        self.put32(addr.0);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.top();
        self.scratch.extend_from_slice(bytes);
    }

    /// Starts a record that [`end_exactly_size`](WriteContext::end_exactly_size) pads to `size`.
    pub fn put_exactly_size(&mut self, size: u32) {
        let len = self.len() as usize;
        self.top().exactly.push((len, size as usize));
    }

    /// Pads the innermost exactly-size record.
    ///
    /// # Panics
    ///
    /// Panics if no record is open or more than the declared size was written.
    pub fn end_exactly_size(&mut self) {
        let (start, size) = self
            .top()
            .exactly
            .pop()
            .expect("end_exactly_size without put_exactly_size");
        let written = self.len() as usize - start;
        assert!(
            written <= size,
            "exactly-size record overran: 0x{:x} > 0x{:x}",
            written,
            size,
        );
        self.scratch.resize(self.scratch.len() + (size - written), 0);
    }

    /// Appends bytes to the output at a multiple of `align`.
    ///
    /// With `dedup`, an earlier blob of the same kind and size with identical contents is reused
    /// instead. Returns null for empty data.
    pub fn append_data_blob(
        &mut self,
        data: &[u8],
        kind: DataBlobType,
        align: u32,
        dedup: bool,
    ) -> SegmentAddr {
        if data.is_empty() {
            return SegmentAddr::NULL;
        }
        if dedup {
            if let Some(offset) = self.find_identical(data, kind, align) {
                log::trace!("reusing {:?} blob at 0x{:06x}", kind, offset);
                return SegmentAddr::new(self.segment, offset);
            }
        }

        while self.output.len() % align as usize != 0 {
            self.output.push(0);
        }
        let offset = self.output.len() as u32;
        self.output.extend_from_slice(data);
        self.written.push(Written {
            kind,
            offset,
            len: data.len() as u32,
        });
        SegmentAddr::new(self.segment, offset)
    }

    fn find_identical(&self, data: &[u8], kind: DataBlobType, align: u32) -> Option<u32> {
        self.written
            .iter()
            .filter(|w| w.kind == kind && w.len as usize == data.len() && w.offset % align == 0)
            .find(|w| {
                let start = w.offset as usize;
                &self.output[start..start + data.len()] == data
            })
            .map(|w| w.offset)
    }

    /// Reserves the start of the output for the main header, which is written last.
    ///
    /// # Panics
    ///
    /// Panics if anything has been written already.
    pub fn reserve_first_header(&mut self, len: u32) {
        assert!(self.output.is_empty(), "first header must be reserved first");
        self.output.resize(len as usize, 0);
        self.first_header = Some(len);
    }

    /// Closes the current blob into the reserved space at offset 0.
    ///
    /// # Panics
    ///
    /// Panics if nothing was reserved, the blob does not fit, or no blob is open.
    pub fn pop_first_header(&mut self) -> SegmentAddr {
        let reserved = self.first_header.take().expect("no first header reserved");
        let frame = self.stack.pop().expect("workblob stack underflow");
        let bytes = self.scratch.split_off(frame.start);
        assert!(
            bytes.len() <= reserved as usize,
            "first header is 0x{:x} bytes, reserved 0x{:x}",
            bytes.len(),
            reserved,
        );
        self.output[..bytes.len()].copy_from_slice(&bytes);
        SegmentAddr::new(self.segment, 0)
    }

    /// Overwrites a word already in the output.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not in this file or the word lies past the end of the output.
    pub fn patch32(&mut self, addr: SegmentAddr, value: u32) {
        assert_eq!(addr.segment(), self.segment);
        let start = addr.offset() as usize;
        self.output[start..start + 4].copy_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> WriteContext {
        WriteContext::new(Segment::SCENE)
    }

    #[test]
    fn put_pads_before_wide_writes() {
        let mut ctx = context();
        ctx.push(4);
        ctx.put8(0x11);
        ctx.put16(0x2233);
        assert_eq!(ctx.len(), 4);
        ctx.put8(0x44);
        ctx.put32(0x5566_7788);
        assert_eq!(ctx.len(), 12);
        let addr = ctx.pop();

        assert_eq!(addr, SegmentAddr(0x0200_0000));
        assert_eq!(
            ctx.output(),
            &[0x11, 0x00, 0x22, 0x33, 0x44, 0x00, 0x00, 0x00, 0x55, 0x66, 0x77, 0x88]
        );
    }

    #[test]
    fn children_land_before_parents() {
        let mut ctx = context();
        ctx.push(4);
        ctx.put32(0xaaaa_aaaa);
        ctx.push(4);
        ctx.put32(0xbbbb_bbbb);
        let child = ctx.pop();
        ctx.put_addr(child);
        let parent = ctx.pop();

        assert_eq!(child, SegmentAddr(0x0200_0000));
        assert_eq!(parent, SegmentAddr(0x0200_0004));
        assert_eq!(
            ctx.finish(),
            vec![0xbb, 0xbb, 0xbb, 0xbb, 0xaa, 0xaa, 0xaa, 0xaa, 0x02, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn identical_blobs_are_shared() {
        let mut ctx = context();
        let pop_word = |ctx: &mut WriteContext, word: u32, unique: bool| {
            ctx.push(4);
            ctx.put32(word);
            if unique {
                ctx.pop_unique()
            } else {
                ctx.pop()
            }
        };
        let a = pop_word(&mut ctx, 1, false);
        let b = pop_word(&mut ctx, 2, false);
        let c = pop_word(&mut ctx, 1, false);
        let d = pop_word(&mut ctx, 1, true);

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_ne!(a, d);
        assert_eq!(ctx.output().len(), 12);
    }

    #[test]
    fn dedup_keys_on_kind() {
        let mut ctx = context();
        let texture = ctx.append_data_blob(&[1; 8], DataBlobType::Texture, 8, true);
        let palette = ctx.append_data_blob(&[1; 8], DataBlobType::Palette, 8, true);
        let again = ctx.append_data_blob(&[1; 8], DataBlobType::Texture, 8, true);
        assert_ne!(texture, palette);
        assert_eq!(texture, again);
    }

    #[test]
    fn alignment_pads_output() {
        let mut ctx = context();
        ctx.append_data_blob(&[1, 2, 3], DataBlobType::Generic, 1, false);
        let addr = ctx.append_data_blob(&[4; 8], DataBlobType::Mesh, 8, false);
        assert_eq!(addr.offset(), 8);
        assert_eq!(&ctx.output()[3..8], &[0; 5]);
    }

    #[test]
    fn empty_blob_is_null() {
        let mut ctx = context();
        ctx.push(4);
        assert!(ctx.pop().is_null());
        assert!(ctx.output().is_empty());
    }

    #[test]
    fn exactly_size_pads_records() {
        let mut ctx = context();
        ctx.push(4);
        ctx.put_exactly_size(0x1c);
        ctx.put16(0x1234);
        ctx.put8(7);
        ctx.end_exactly_size();
        assert_eq!(ctx.len(), 0x1c);
        ctx.put_exactly_size(0x1c);
        ctx.end_exactly_size();
        assert_eq!(ctx.len(), 0x38);
        ctx.pop();
    }

    #[test]
    #[should_panic(expected = "overran")]
    fn exactly_size_overrun_panics() {
        let mut ctx = context();
        ctx.push(4);
        ctx.put_exactly_size(2);
        ctx.put32(0);
        ctx.end_exactly_size();
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn stack_overflow_panics() {
        let mut ctx = context();
        for _ in 0..=WORKBLOB_STACK_SIZE {
            ctx.push(4);
        }
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn stack_underflow_panics() {
        context().pop();
    }

    #[test]
    fn first_header_goes_to_offset_zero() {
        let mut ctx = context();
        ctx.reserve_first_header(8);
        ctx.push(4);
        ctx.put32(0xcccc_cccc);
        let payload = ctx.pop();
        ctx.push(8);
        ctx.put32(0x0401_0000);
        ctx.put_addr(payload);
        assert_eq!(ctx.pop_first_header(), SegmentAddr(0x0200_0000));

        assert_eq!(payload, SegmentAddr(0x0200_0008));
        assert_eq!(
            ctx.finish(),
            vec![0x04, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x08, 0xcc, 0xcc, 0xcc, 0xcc]
        );
    }

    #[test]
    fn patch_rewrites_words() {
        let mut ctx = context();
        ctx.append_data_blob(&[0; 8], DataBlobType::Mesh, 8, false);
        ctx.patch32(SegmentAddr(0x0200_0004), 0x0300_1234);
        assert_eq!(ctx.output(), &[0, 0, 0, 0, 0x03, 0x00, 0x12, 0x34]);
    }
}
