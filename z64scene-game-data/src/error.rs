use thiserror::Error;
use z64scene_datablob::DataBlobError;
use z64scene_read::ReadError;
use z64scene_segment::{SegmentAddr, SegmentError};

use crate::cutscene::CutsceneError;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("{0}")]
    ReadError(#[from] ReadError),

    #[error("{0}")]
    SegmentError(#[from] SegmentError),

    #[error("{0}")]
    DataBlobError(#[from] DataBlobError),

    #[error("{0}")]
    CutsceneError(#[from] CutsceneError),

    #[error("{0:?} cannot be a header: wrong segment, misaligned or past the end of the file")]
    UnlikelyHeader(SegmentAddr),

    #[error("not a header: {addr:?} contains opcode 0x{opcode:02x}")]
    NotAHeader { addr: SegmentAddr, opcode: u8 },

    #[error("header {0:?} runs past the end of the file")]
    Unterminated(SegmentAddr),

    #[error("special objects declared twice in header {0:?}")]
    DuplicateSpecialObjects(SegmentAddr),

    #[error("collision header redeclared at {found:?}, first declared at {first:?}")]
    CollisionMismatch {
        first: SegmentAddr,
        found: SegmentAddr,
    },
}

impl SceneError {
    /// Whether the file is unusable, as opposed to one header or payload being unreadable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SceneError::DuplicateSpecialObjects(_)
                | SceneError::CollisionMismatch { .. }
                | SceneError::DataBlobError(DataBlobError::Oversized { .. })
        )
    }
}
