use crate::{bytes_at, FromData, Layout, ReadError};

/// Sequential big-endian reader over one buffer.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], offset: u32) -> Self {
        Self { data, offset }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn read<T>(&mut self) -> Result<T, ReadError>
    where
        T: FromData + Layout,
    {
        let value = T::from_data(self.data, self.offset)?;
        self.offset += T::SIZE;
        Ok(value)
    }

    pub fn bytes(&mut self, len: u32) -> Result<&'a [u8], ReadError> {
        let bytes = bytes_at(self.data, self.offset, len)?;
        self.offset += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: u32) {
        self.offset += len;
    }

    pub fn seek(&mut self, offset: u32) {
        self.offset = offset;
    }
}
