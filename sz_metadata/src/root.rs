use crate::cursor::Cursor;
use crate::error::{MetadataError, Result};

const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// The streams of a metadata root (ECMA-335 II.24.2.1) that size accounting reads.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetadataRoot<'data> {
    pub(crate) version: &'data str,
    pub(crate) tables: &'data [u8],
    pub(crate) strings: &'data [u8],
    pub(crate) blobs: &'data [u8],
}

pub(crate) fn parse_metadata_root(data: &[u8]) -> Result<MetadataRoot<'_>> {
    let mut cursor = Cursor::new(data, "metadata root");
    let signature = cursor.read_u32()?;
    if signature != METADATA_SIGNATURE {
        return Err(MetadataError::BadMetadataSignature(signature));
    }
    let _major_version = cursor.read_u16()?;
    let _minor_version = cursor.read_u16()?;
    let _reserved = cursor.read_u32()?;
    let version_length = cursor.read_u32()? as usize;
    let version_bytes = cursor.read_bytes(version_length)?;
    let version_text = version_bytes
        .split(|byte| *byte == 0)
        .next()
        .unwrap_or_default();
    let version = std::str::from_utf8(version_text).map_err(|_| MetadataError::BadVersionString)?;
    let _flags = cursor.read_u16()?;
    let stream_count = cursor.read_u16()?;

    let mut tables = None;
    let mut strings = None;
    let mut blobs = None;
    for _ in 0..stream_count {
        let offset = cursor.read_u32()? as usize;
        let size = cursor.read_u32()? as usize;
        let name = cursor.read_c_string()?;
        let consumed = name.len() + 1;
        cursor.skip((4 - consumed % 4) % 4)?;

        let stream = Cursor::at(data, offset, "metadata stream")?.read_bytes(size)?;
        match name {
            b"#~" | b"#-" => tables = Some(stream),
            b"#Strings" => strings = Some(stream),
            b"#Blob" => blobs = Some(stream),
            _ => {}
        }
    }

    Ok(MetadataRoot {
        version,
        tables: tables.ok_or(MetadataError::MissingStream("#~"))?,
        strings: strings.ok_or(MetadataError::MissingStream("#Strings"))?,
        blobs: blobs.ok_or(MetadataError::MissingStream("#Blob"))?,
    })
}
