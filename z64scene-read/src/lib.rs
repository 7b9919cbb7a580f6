mod cursor;
mod error;
mod file;
mod from_data;
mod layout;
mod slice;

pub use cursor::Cursor;
pub use error::ReadError;
pub use file::OwnedFile;
pub use from_data::{bytes_at, read_at, FromData};
pub use layout::Layout;
pub use slice::Slice;
