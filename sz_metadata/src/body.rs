use crate::cursor::Cursor;
use crate::error::Result;

const FORMAT_MASK: u8 = 0x03;
const TINY_FORMAT: u8 = 0x02;
const FAT_FORMAT: u8 = 0x03;
const TINY_SIZE_SHIFT: u8 = 2;

const FAT_MORE_SECTS: u16 = 0x08;
const FAT_MIN_HEADER_SIZE: usize = 12;

const SECTION_FAT_FORMAT: u8 = 0x40;
const SECTION_MORE_SECTS: u8 = 0x80;

/// Total encoded length of the method body starting at `data[0]`: header, IL
/// stream and any extra data sections. `None` when the header is not a valid
/// tiny or fat header or the body runs past `data`.
pub fn method_body_len(data: &[u8]) -> Option<usize> {
    let first = *data.first()?;
    match first & FORMAT_MASK {
        TINY_FORMAT => {
            let length = 1 + usize::from(first >> TINY_SIZE_SHIFT);
            (length <= data.len()).then_some(length)
        }
        FAT_FORMAT => fat_body_len(data).ok().flatten(),
        _ => None,
    }
}

fn fat_body_len(data: &[u8]) -> Result<Option<usize>> {
    let mut header = Cursor::new(data, "fat method header");
    let flags = header.read_u16()?;
    let _max_stack = header.read_u16()?;
    let code_size = header.read_u32()? as usize;

    let header_size = usize::from(flags >> 12) * 4;
    if header_size < FAT_MIN_HEADER_SIZE {
        return Ok(None);
    }
    let Some(mut end) = header_size.checked_add(code_size) else {
        return Ok(None);
    };
    if end > data.len() {
        return Ok(None);
    }

    let mut more_sections = flags & FAT_MORE_SECTS != 0;
    while more_sections {
        end = end.next_multiple_of(4);
        let mut section = Cursor::at(data, end, "method data section")?;
        let kind = section.read_u8()?;
        let section_size = if kind & SECTION_FAT_FORMAT != 0 {
            let size = section.read_bytes(3)?;
            usize::from(size[0]) | (usize::from(size[1]) << 8) | (usize::from(size[2]) << 16)
        } else {
            usize::from(section.read_u8()?)
        };
        if section_size == 0 {
            return Ok(None);
        }
        end += section_size;
        if end > data.len() {
            return Ok(None);
        }
        more_sections = kind & SECTION_MORE_SECTS != 0;
    }
    Ok(Some(end))
}
