use z64scene_datablob::{BlobRef, DataBlob, DataBlobError, DataBlobList, DataBlobType};
use z64scene_segment::SegmentAddr;
use z64scene_write::WriteContext;

/// Maps original segment addresses to the addresses blobs were written at.
pub struct BlobLookup<'l> {
    lists: Vec<&'l DataBlobList>,
}

impl<'l> BlobLookup<'l> {
    pub fn new(lists: Vec<&'l DataBlobList>) -> Self {
        Self { lists }
    }

    /// Updated address of the blob at `addr`, or `addr` itself when no written blob starts there.
    pub fn relocate(&self, addr: SegmentAddr) -> SegmentAddr {
        if addr.is_null() {
            return addr;
        }
        self.lists
            .iter()
            .filter(|list| list.segment() == addr.segment())
            .find_map(|list| list.updated_addr(addr))
            .unwrap_or_else(|| {
                log::trace!("no written blob at {:?}, keeping the address", addr);
                addr
            })
    }
}

/// Appends every live blob of `list` to the output, recording where each one landed.
///
/// Non-mesh blobs are deduplicated by content. Meshes are always written separately, since their
/// pointer words are patched afterwards.
pub(crate) fn write_blobs(
    ctx: &mut WriteContext,
    list: &mut DataBlobList,
    file: &[u8],
) -> Result<(), DataBlobError> {
    list.reset_updated();
    let mut blobs: Vec<&mut DataBlob> = list.iter_mut().filter(|blob| !blob.is_dead()).collect();
    blobs.sort_by_key(|blob| blob.original_addr);

    let (meshes, others): (Vec<_>, Vec<_>) = blobs
        .into_iter()
        .partition(|blob| blob.kind == DataBlobType::Mesh);
    for (blob, dedup) in others
        .into_iter()
        .map(|blob| (blob, true))
        .chain(meshes.into_iter().map(|blob| (blob, false)))
    {
        let data = blob.data(file)?;
        blob.updated_addr = ctx.append_data_blob(data, blob.kind, blob.kind.alignment(), dedup);
    }
    Ok(())
}

/// Written blobs whose original range covers `offset`.
///
/// Display lists may call into each other's interiors, so several mesh copies can hold the same
/// word. Every one of them is returned. Other blobs are only consulted when no mesh matches.
fn containers_of(list: &DataBlobList, offset: u32) -> Vec<&DataBlob> {
    let meshes: Vec<&DataBlob> = list
        .iter()
        .filter(|blob| !blob.is_dead() && !blob.updated_addr.is_null())
        .filter(|blob| blob.kind == DataBlobType::Mesh && blob.contains_offset(offset))
        .collect();
    if !meshes.is_empty() {
        return meshes;
    }
    list.find_containing(offset)
        .filter(|blob| !blob.updated_addr.is_null())
        .into_iter()
        .collect()
}

/// Rewrites the pointer words of file `file` that refer to blobs in `targets`.
///
/// `containers` holds the blobs of the file being written; each word is patched where its
/// enclosing blob landed.
pub(crate) fn patch_refs(
    ctx: &mut WriteContext,
    file: u16,
    containers: &DataBlobList,
    targets: &[&DataBlobList],
) {
    let mut patched = 0;
    for target in targets.iter().flat_map(|list| list.iter()) {
        if target.is_dead() || target.updated_addr.is_null() {
            continue;
        }
        for r in target.refs() {
            let offset = match *r {
                BlobRef::Word {
                    segment,
                    file: ref_file,
                    offset,
                } if segment == ctx.segment() && ref_file == file => offset,
                _ => continue,
            };
            let holders = containers_of(containers, offset);
            if holders.is_empty() {
                log::warn!(
                    "pointer to {:?} at offset 0x{:06x} lies outside every written blob",
                    target.original_addr,
                    offset
                );
            }
            for container in holders {
                let at = SegmentAddr::new(
                    ctx.segment(),
                    container.updated_addr.offset() + (offset - container.offset()),
                );
                ctx.patch32(at, target.updated_addr.0);
                patched += 1;
            }
        }
    }
    log::debug!("patched {} pointer words in file {}", patched, file);
}

#[cfg(test)]
mod tests {
    use super::*;
    use z64scene_segment::Segment;

    #[test]
    fn meshes_are_patched_after_placement() {
        // 0x00: vertices, 0x10: a display list whose first command points at them
        let mut file = vec![0x11; 0x10];
        file.extend_from_slice(&[0x01, 0x00, 0x10, 0x02, 0x03, 0x00, 0x00, 0x00]);
        file.extend_from_slice(&[0xdf, 0, 0, 0, 0, 0, 0, 0]);

        let mut list = DataBlobList::for_file(Segment::ROOM, 1);
        list.push(SegmentAddr(0x0300_0010), 0x10, DataBlobType::Mesh)
            .add_ref(BlobRef::Entity);
        list.push(SegmentAddr(0x0300_0000), 0x10, DataBlobType::Vertex)
            .add_ref(BlobRef::Word {
                segment: Segment::ROOM,
                file: 1,
                offset: 0x14,
            });
        // dead
        list.push(SegmentAddr(0x0300_0008), 0x4, DataBlobType::Texture);

        let mut ctx = WriteContext::new(Segment::ROOM);
        ctx.reserve_first_header(0x8);
        write_blobs(&mut ctx, &mut list, &file).unwrap();
        patch_refs(&mut ctx, 1, &list, &[&list]);

        let lookup = BlobLookup::new(vec![&list]);
        assert_eq!(lookup.relocate(SegmentAddr(0x0300_0000)), SegmentAddr(0x0300_0008));
        assert_eq!(lookup.relocate(SegmentAddr(0x0300_0010)), SegmentAddr(0x0300_0018));
        assert_eq!(lookup.relocate(SegmentAddr(0x0600_0000)), SegmentAddr(0x0600_0000));
        assert_eq!(list.updated_addr(SegmentAddr(0x0300_0008)), None);

        ctx.push(4);
        ctx.put32(0);
        ctx.pop_first_header();
        let out = ctx.finish();
        assert_eq!(&out[0x1c..0x20], &[0x03, 0x00, 0x00, 0x08]);
    }
}
