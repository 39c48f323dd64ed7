use object::endian::{LittleEndian as LE, U16Bytes, U32Bytes, U64Bytes};
use object::read::Bytes;

use crate::error::{MetadataError, Result};

/// Little-endian reader over a metadata slice. Every short read is reported as
/// `Truncated` with the structure being decoded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'data> {
    bytes: Bytes<'data>,
    context: &'static str,
}

impl<'data> Cursor<'data> {
    pub(crate) fn new(data: &'data [u8], context: &'static str) -> Self {
        Self {
            bytes: Bytes(data),
            context,
        }
    }

    pub(crate) fn at(data: &'data [u8], offset: usize, context: &'static str) -> Result<Self> {
        let mut cursor = Self::new(data, context);
        cursor.skip(offset)?;
        Ok(cursor)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<()> {
        let context = self.context;
        self.bytes
            .skip(count)
            .map_err(|()| MetadataError::Truncated(context))
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<&'data [u8]> {
        let context = self.context;
        self.bytes
            .read_bytes(count)
            .map(|bytes| bytes.0)
            .map_err(|()| MetadataError::Truncated(context))
    }

    /// Reads a NUL-terminated string and consumes the terminator.
    pub(crate) fn read_c_string(&mut self) -> Result<&'data [u8]> {
        let context = self.context;
        self.bytes
            .read_string()
            .map_err(|()| MetadataError::Truncated(context))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let context = self.context;
        self.bytes
            .read::<u8>()
            .copied()
            .map_err(|()| MetadataError::Truncated(context))
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let context = self.context;
        self.bytes
            .read::<U16Bytes<LE>>()
            .map(|value| value.get(LE))
            .map_err(|()| MetadataError::Truncated(context))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let context = self.context;
        self.bytes
            .read::<U32Bytes<LE>>()
            .map(|value| value.get(LE))
            .map_err(|()| MetadataError::Truncated(context))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let context = self.context;
        self.bytes
            .read::<U64Bytes<LE>>()
            .map(|value| value.get(LE))
            .map_err(|()| MetadataError::Truncated(context))
    }

    /// Reads a 2- or 4-byte heap or table index.
    pub(crate) fn read_index(&mut self, wide: bool) -> Result<u32> {
        if wide {
            self.read_u32()
        } else {
            self.read_u16().map(u32::from)
        }
    }

    /// ECMA-335 II.23.2 compressed unsigned integer.
    pub(crate) fn read_compressed_u32(&mut self) -> Result<u32> {
        let first = self.read_u8()?;
        if first & 0x80 == 0 {
            return Ok(u32::from(first));
        }
        if first & 0xC0 == 0x80 {
            let second = self.read_u8()?;
            return Ok((u32::from(first & 0x3F) << 8) | u32::from(second));
        }
        if first & 0xE0 == 0xC0 {
            let rest = self.read_bytes(3)?;
            return Ok((u32::from(first & 0x1F) << 24)
                | (u32::from(rest[0]) << 16)
                | (u32::from(rest[1]) << 8)
                | u32::from(rest[2]));
        }
        Err(MetadataError::Truncated(self.context))
    }
}
