use z64scene_segment::SegmentAddr;

use crate::{DataBlob, DataBlobError, DataBlobList, DataBlobType};

/// Largest blob a 24-bit segment offset can describe.
pub const MAX_BLOB_SIZE: u32 = 0x00ff_ffff;

/// Shrinks blobs that run into the blob that follows them.
///
/// Blobs from all lists are ordered by address. Sizes estimated at discovery time (palettes,
/// textures, backgrounds) are cut back to the start of the next blob in the same buffer. Meshes
/// keep their size because it always runs exactly through the terminating command.
///
/// # Errors
///
/// Returns [`DataBlobError::Oversized`] if any blob is still larger than [`MAX_BLOB_SIZE`].
pub fn trim_overlaps<'l, I>(lists: I) -> Result<(), DataBlobError>
where
    I: IntoIterator<Item = &'l mut DataBlobList>,
{
    let mut blobs: Vec<&mut DataBlob> = lists
        .into_iter()
        .flat_map(|list| list.iter_mut())
        .collect();
    blobs.sort_by_key(|blob| blob.original_addr);

    for i in 1..blobs.len() {
        let next: SegmentAddr = blobs[i].original_addr;
        let blob = &mut blobs[i - 1];
        if blob.kind == DataBlobType::Mesh || blob.segment() != next.segment() {
            continue;
        }
        if blob.offset() + blob.size > next.offset() {
            let size = next.offset() - blob.offset();
            log::debug!(
                "trimming {:?} blob {:?} from 0x{:x} to 0x{:x} bytes",
                blob.kind,
                blob.original_addr,
                blob.size,
                size,
            );
            blob.size = size;
        }
    }

    match blobs.iter().find(|blob| blob.size > MAX_BLOB_SIZE) {
        Some(blob) => Err(DataBlobError::Oversized {
            addr: blob.original_addr,
            size: blob.size,
        }),
        None => Ok(()),
    }
}
