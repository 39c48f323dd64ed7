use crate::cursor::Cursor;
use crate::error::{MetadataError, Result};

/// `#Strings`: NUL-terminated UTF-8 identifiers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringHeap<'data> {
    data: &'data [u8],
}

impl<'data> StringHeap<'data> {
    pub(crate) fn new(data: &'data [u8]) -> Self {
        Self { data }
    }

    pub(crate) fn get(&self, index: u32) -> Result<&'data str> {
        if index == 0 {
            return Ok("");
        }
        let bad_index = || MetadataError::BadStringIndex(index);
        let mut cursor =
            Cursor::at(self.data, index as usize, "#Strings").map_err(|_| bad_index())?;
        let bytes = cursor.read_c_string().map_err(|_| bad_index())?;
        std::str::from_utf8(bytes).map_err(|_| bad_index())
    }
}

/// `#Blob`: length-prefixed byte runs (signatures, constants, ...).
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlobHeap<'data> {
    data: &'data [u8],
}

impl<'data> BlobHeap<'data> {
    pub(crate) fn new(data: &'data [u8]) -> Self {
        Self { data }
    }

    pub(crate) fn get(&self, index: u32) -> Result<&'data [u8]> {
        if index == 0 {
            return Ok(&[]);
        }
        let bad_index = || MetadataError::BadBlobIndex(index);
        let mut cursor = Cursor::at(self.data, index as usize, "#Blob").map_err(|_| bad_index())?;
        let length = cursor.read_compressed_u32().map_err(|_| bad_index())?;
        cursor.read_bytes(length as usize).map_err(|_| bad_index())
    }

    /// Content length of the blob, excluding its compressed length prefix.
    pub(crate) fn len_at(&self, index: u32) -> Result<usize> {
        self.get(index).map(<[u8]>::len)
    }
}
