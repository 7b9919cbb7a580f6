use std::ops::Range;
use z64scene_read::bytes_at;
use z64scene_segment::{Segment, SegmentAddr};

use crate::gbi::{TextureDepth, TextureFormat};
use crate::DataBlobError;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DataBlobType {
    Unset,
    Mesh,
    Vertex,
    Matrix,
    Texture,
    Palette,
    Generic,
    Eof,
}

impl DataBlobType {
    /// Output alignment used when the blob is written.
    pub fn alignment(self) -> u32 {
        match self {
            DataBlobType::Mesh
            | DataBlobType::Vertex
            | DataBlobType::Matrix
            | DataBlobType::Texture
            | DataBlobType::Palette => 8,
            DataBlobType::Unset | DataBlobType::Generic | DataBlobType::Eof => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataBlobSubtype {
    None,
    Flipbook,
}

/// A consumer of a blob's address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BlobRef {
    /// A big-endian word inside a loaded file that holds the blob's segment address, such as the
    /// second word of a `G_VTX` command. `file` tells apart files that share a segment.
    Word {
        segment: Segment,
        file: u16,
        offset: u32,
    },

    /// A parsed entity field (mesh header entries, texture animation lists, backgrounds).
    Entity,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextureInfo {
    pub format: TextureFormat,
    pub depth: TextureDepth,
    pub width: u16,
    pub height: u16,
    pub palette: Option<SegmentAddr>,
}

/// One logical byte range inside a loaded file.
///
/// The file owns the bytes. A blob only records where they are: its original segment address
/// doubles as the byte offset into the file that backs the segment.
#[derive(Clone, Debug)]
pub struct DataBlob {
    pub original_addr: SegmentAddr,
    /// Address assigned by the most recent write pass, or null.
    pub updated_addr: SegmentAddr,
    pub size: u32,
    pub kind: DataBlobType,
    pub subtype: DataBlobSubtype,
    pub texture: Option<TextureInfo>,
    refs: Vec<BlobRef>,
}

impl DataBlob {
    pub fn new(original_addr: SegmentAddr, size: u32, kind: DataBlobType) -> Self {
        Self {
            original_addr,
            updated_addr: SegmentAddr::NULL,
            size,
            kind,
            subtype: DataBlobSubtype::None,
            texture: None,
            refs: vec![],
        }
    }

    pub fn segment(&self) -> Segment {
        self.original_addr.segment()
    }

    /// Byte offset of the blob within its file.
    pub fn offset(&self) -> u32 {
        self.original_addr.offset()
    }

    pub fn range(&self) -> Range<u32> {
        self.offset()..self.offset() + self.size
    }

    pub fn contains_offset(&self, offset: u32) -> bool {
        self.range().contains(&offset)
    }

    /// Borrows the blob's bytes from the file that backs its segment.
    pub fn data<'a>(&self, file: &'a [u8]) -> Result<&'a [u8], DataBlobError> {
        Ok(bytes_at(file, self.offset(), self.size)?)
    }

    pub fn refs(&self) -> &[BlobRef] {
        &self.refs
    }

    /// Records a consumer. Each file word is only counted once.
    pub fn add_ref(&mut self, r: BlobRef) {
        if let BlobRef::Word { .. } = r {
            if self.refs.contains(&r) {
                return;
            }
        }
        self.refs.push(r);
    }

    /// Drops one matching consumer, returning whether one was found.
    pub fn remove_ref(&mut self, r: BlobRef) -> bool {
        match self.refs.iter().position(|x| *x == r) {
            Some(index) => {
                self.refs.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_refs(&mut self) {
        self.refs.clear();
    }

    /// Blobs nothing refers to are left out of written files.
    pub fn is_dead(&self) -> bool {
        self.refs.is_empty()
    }
}
