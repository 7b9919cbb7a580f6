//! Registry of the byte ranges ("blobs") that scene and room files point into.
//!
//! Blobs are discovered while parsing, coalesced by original segment address, trimmed so that
//! they never overlap, and finally relocated by the writer.

mod blob;
mod discover;
mod error;
pub mod gbi;
mod list;
mod segments;
mod trim;

pub use blob::{BlobRef, DataBlob, DataBlobSubtype, DataBlobType, TextureInfo};
pub use discover::discover_display_list;
pub use error::DataBlobError;
pub use list::DataBlobList;
pub use segments::BlobSegments;
pub use trim::{trim_overlaps, MAX_BLOB_SIZE};
