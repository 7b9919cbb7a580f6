use std::collections::VecDeque;
use z64scene_segment::{Segment, SegmentAddr};

use crate::{DataBlob, DataBlobType};

/// The blobs discovered in one segment.
///
/// New blobs are prepended, so iteration visits the most recently discovered blob first.
#[derive(Clone, Debug)]
pub struct DataBlobList {
    segment: Segment,
    file: u16,
    blobs: VecDeque<DataBlob>,
}

impl DataBlobList {
    pub fn new(segment: Segment) -> Self {
        Self::for_file(segment, 0)
    }

    /// A list for one of several files loaded into the same segment over time, such as rooms.
    pub fn for_file(segment: Segment, file: u16) -> Self {
        Self {
            segment,
            file,
            blobs: VecDeque::new(),
        }
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn file(&self) -> u16 {
        self.file
    }

    /// Registers a blob, or grows the existing blob at the same address.
    ///
    /// # Panics
    ///
    /// Panics if `addr` belongs to another segment.
    pub fn push(&mut self, addr: SegmentAddr, size: u32, kind: DataBlobType) -> &mut DataBlob {
        assert_eq!(
            addr.segment(),
            self.segment,
            "blob pushed to the wrong segment list"
        );
        match self.blobs.iter().position(|blob| blob.original_addr == addr) {
            Some(index) => {
                let blob = &mut self.blobs[index];
                blob.size = blob.size.max(size);
                blob
            }
            None => {
                log::debug!("new {:?} blob {:?}, 0x{:x} bytes", kind, addr, size);
                self.blobs.push_front(DataBlob::new(addr, size, kind));
                &mut self.blobs[0]
            }
        }
    }

    pub fn find(&self, addr: SegmentAddr) -> Option<&DataBlob> {
        self.blobs.iter().find(|blob| blob.original_addr == addr)
    }

    pub fn find_mut(&mut self, addr: SegmentAddr) -> Option<&mut DataBlob> {
        self.blobs.iter_mut().find(|blob| blob.original_addr == addr)
    }

    /// Finds the blob whose original range covers a byte offset.
    pub fn find_containing(&self, offset: u32) -> Option<&DataBlob> {
        self.blobs.iter().find(|blob| blob.contains_offset(offset))
    }

    /// Address `addr` was relocated to by the last write, if a live blob starts there.
    pub fn updated_addr(&self, addr: SegmentAddr) -> Option<SegmentAddr> {
        self.find(addr)
            .and_then(|blob| blob.updated_addr.non_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataBlob> + '_ {
        self.blobs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DataBlob> + '_ {
        self.blobs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn reset_updated(&mut self) {
        for blob in self.blobs.iter_mut() {
            blob.updated_addr = SegmentAddr::NULL;
        }
    }
}
