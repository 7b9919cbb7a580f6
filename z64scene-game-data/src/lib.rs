pub mod actor_cutscene;
pub mod collision;
pub mod cutscene;
mod error;
mod game;
pub mod header_common;
pub mod header_room;
pub mod header_scene;
pub mod instance;
pub mod light;
pub mod mesh;
pub mod path;
mod relocate;
pub mod room;
pub mod scene;
pub mod texanim;

pub use error::SceneError;
pub use game::{Game, ParseContext, UnknownGame};
pub use relocate::BlobLookup;
pub use room::Room;
pub use scene::{Scene, SceneFiles};
