use z64scene_segment::{Segment, SegmentAddr, SegmentTable};

use crate::{BlobRef, DataBlob, DataBlobList, DataBlobType};

/// Segment registrations shared by blob discovery and pointer resolution.
///
/// Setting up a segment maps its buffer in the segment table and attaches the blob list that
/// discoveries in that segment are recorded into.
#[derive(Default)]
pub struct BlobSegments<'a> {
    segment_table: SegmentTable<'a>,
    lists: [Option<DataBlobList>; Segment::COUNT],
}

impl<'a> BlobSegments<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a segment to its buffer and to the list its blobs are pushed into.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is greater than 15 or does not match the list's segment.
    pub fn setup_segment(&mut self, segment: Segment, data: &'a [u8], list: DataBlobList) {
        assert_eq!(segment, list.segment());
        self.segment_table.set(segment, data);
        self.lists[segment.index()] = Some(list);
    }

    pub fn segment_table(&self) -> &SegmentTable<'a> {
        &self.segment_table
    }

    pub fn list(&self, segment: Segment) -> Option<&DataBlobList> {
        self.lists.get(segment.0 as usize)?.as_ref()
    }

    pub fn list_mut(&mut self, segment: Segment) -> Option<&mut DataBlobList> {
        self.lists.get_mut(segment.0 as usize)?.as_mut()
    }

    /// Detaches a segment's list, leaving the buffer mapped.
    pub fn take(&mut self, segment: Segment) -> Option<DataBlobList> {
        self.lists.get_mut(segment.0 as usize)?.take()
    }

    /// Identifies the file currently mapped to a segment, for [`BlobRef::Word`].
    pub fn file(&self, segment: Segment) -> Option<u16> {
        self.list(segment).map(DataBlobList::file)
    }

    pub fn lists_mut(&mut self) -> impl Iterator<Item = &mut DataBlobList> + '_ {
        self.lists.iter_mut().filter_map(Option::as_mut)
    }

    /// Registers a blob with one consumer.
    ///
    /// Returns `None` without registering anything when the address is null, its segment has no
    /// list, or it starts outside the segment's buffer. The size is clamped to the buffer.
    pub fn push(
        &mut self,
        addr: SegmentAddr,
        size: u32,
        kind: DataBlobType,
        r: BlobRef,
    ) -> Option<&mut DataBlob> {
        if addr.is_null() {
            return None;
        }
        let data_len = match self.segment_table.get(addr.segment()) {
            Ok(data) => data.len() as u32,
            Err(_) => return None,
        };
        if addr.offset() >= data_len {
            log::warn!("ignoring {:?} blob past the end of its segment: {:?}", kind, addr);
            return None;
        }
        let size = size.min(data_len - addr.offset());
        let list = self.list_mut(addr.segment())?;
        let blob = list.push(addr, size, kind);
        blob.add_ref(r);
        Some(blob)
    }

    /// Adds a consumer to an already registered blob.
    pub fn add_ref(&mut self, addr: SegmentAddr, r: BlobRef) -> bool {
        match self
            .list_mut(addr.segment())
            .and_then(|list| list.find_mut(addr))
        {
            Some(blob) => {
                blob.add_ref(r);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_requires_setup() {
        let scene = [0u8; 0x40];
        let mut segments = BlobSegments::new();
        segments.setup_segment(Segment::SCENE, &scene, DataBlobList::new(Segment::SCENE));

        assert!(segments
            .push(SegmentAddr(0x0400_0000), 8, DataBlobType::Vertex, BlobRef::Entity)
            .is_none());
        assert!(segments
            .push(SegmentAddr(0x0200_0040), 8, DataBlobType::Vertex, BlobRef::Entity)
            .is_none());

        let blob = segments
            .push(SegmentAddr(0x0200_0038), 0x20, DataBlobType::Texture, BlobRef::Entity)
            .unwrap();
        assert_eq!(blob.size, 8);

        let list = segments.take(Segment::SCENE).unwrap();
        assert_eq!(list.len(), 1);
        assert!(segments.segment_table().is_mapped(Segment::SCENE));
    }
}
