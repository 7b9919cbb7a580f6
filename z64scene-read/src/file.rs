use std::fs;
use std::io;
use std::path::Path;

/// A whole loaded file.
///
/// Parsed entities refer into this buffer by offset. Function parameters should generally prefer
/// the borrowed slice from [`OwnedFile::borrow`].
#[derive(Clone)]
pub struct OwnedFile {
    data: Box<[u8]>,
}

impl OwnedFile {
    pub fn new(data: Box<[u8]>) -> Self {
        Self { data }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(fs::read(path)?.into_boxed_slice()))
    }

    pub fn borrow(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for OwnedFile {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data.into_boxed_slice())
    }
}
