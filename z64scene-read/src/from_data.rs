use byteorder::{BigEndian, ReadBytesExt};
use z64scene_segment::{SegmentAddr, SegmentTable};

use crate::{Layout, ReadError};

/// Types that can be decoded from a big-endian buffer at an offset.
pub trait FromData: Sized {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError>;
}

/// Borrows `len` bytes of `data` starting at `offset`.
pub fn bytes_at(data: &[u8], offset: u32, len: u32) -> Result<&[u8], ReadError> {
    let start = offset as usize;
    data.get(start..start + len as usize)
        .ok_or(ReadError::OutOfRange {
            offset,
            len,
            size: data.len() as u32,
        })
}

/// Decodes a value at a segment address.
pub fn read_at<T>(segment_table: &SegmentTable<'_>, addr: SegmentAddr) -> Result<T, ReadError>
where
    T: FromData + Layout,
{
    let data = segment_table.get(addr.segment())?;
    T::from_data(data, addr.offset())
}

impl FromData for bool {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(u8::from_data(data, offset)? != 0)
    }
}

impl FromData for u8 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 1)?.read_u8().unwrap())
    }
}

impl FromData for i8 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 1)?.read_i8().unwrap())
    }
}

impl FromData for u16 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 2)?.read_u16::<BigEndian>().unwrap())
    }
}

impl FromData for i16 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 2)?.read_i16::<BigEndian>().unwrap())
    }
}

impl FromData for u32 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 4)?.read_u32::<BigEndian>().unwrap())
    }
}

impl FromData for i32 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 4)?.read_i32::<BigEndian>().unwrap())
    }
}

impl FromData for f32 {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(bytes_at(data, offset, 4)?.read_f32::<BigEndian>().unwrap())
    }
}

impl FromData for SegmentAddr {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok(SegmentAddr(u32::from_data(data, offset)?))
    }
}

impl FromData for [i16; 3] {
    fn from_data(data: &[u8], offset: u32) -> Result<Self, ReadError> {
        Ok([
            i16::from_data(data, offset)?,
            i16::from_data(data, offset + 2)?,
            i16::from_data(data, offset + 4)?,
        ])
    }
}
