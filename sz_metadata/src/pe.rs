use std::path::{Path, PathBuf};

use object::FileKind;
use object::pe::IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR;
use object::read::pe::{ImageNtHeaders, PeFile, SectionTable};

use crate::cursor::Cursor;
use crate::error::{MetadataError, Result};
use crate::reader::MetadataReader;

/// A managed module loaded into memory. The file handle is released as soon as
/// `open` returns; everything afterwards borrows the owned bytes.
#[derive(Debug, Clone)]
pub struct ModuleFile {
    path: PathBuf,
    data: Vec<u8>,
}

impl ModuleFile {
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "read module image");
        Ok(Self::from_bytes(path, data))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reader(&self) -> Result<MetadataReader<'_>> {
        let image = PeImage::parse(&self.data)?;
        MetadataReader::parse(image)
    }
}

/// Section mapping plus the location of the CLI metadata inside a PE image.
#[derive(Debug)]
pub(crate) struct PeImage<'data> {
    data: &'data [u8],
    sections: SectionTable<'data>,
    metadata: &'data [u8],
}

impl<'data> PeImage<'data> {
    pub(crate) fn parse(data: &'data [u8]) -> Result<Self> {
        let kind = FileKind::parse(data)
            .map_err(|error| MetadataError::NotPortableExecutable(error.to_string()))?;
        match kind {
            FileKind::Pe32 => Self::parse_headers::<object::pe::ImageNtHeaders32>(data),
            FileKind::Pe64 => Self::parse_headers::<object::pe::ImageNtHeaders64>(data),
            other => Err(MetadataError::NotPortableExecutable(format!("{other:?}"))),
        }
    }

    fn parse_headers<Pe: ImageNtHeaders>(data: &'data [u8]) -> Result<Self> {
        let file: PeFile<'data, Pe> = PeFile::parse(data)?;
        let sections = file.section_table();
        let cli_directory = file
            .data_directory(IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR)
            .ok_or(MetadataError::NotManaged)?;
        let cli_header = cli_directory.data(data, &sections)?;

        // IMAGE_COR20_HEADER: cb, runtime major/minor, then the metadata directory.
        let mut cursor = Cursor::new(cli_header, "CLI header");
        let _header_size = cursor.read_u32()?;
        let _runtime_major = cursor.read_u16()?;
        let _runtime_minor = cursor.read_u16()?;
        let metadata_rva = cursor.read_u32()?;
        let metadata_size = cursor.read_u32()? as usize;

        let metadata_start = sections
            .pe_data_at(data, metadata_rva)
            .ok_or(MetadataError::UnmappedRva(metadata_rva))?;
        let metadata = Cursor::new(metadata_start, "metadata").read_bytes(metadata_size)?;
        tracing::debug!(metadata_rva, metadata_size, "located CLI metadata");

        Ok(Self {
            data,
            sections,
            metadata,
        })
    }

    pub(crate) fn metadata(&self) -> &'data [u8] {
        self.metadata
    }

    /// Bytes from `rva` to the end of its section.
    pub(crate) fn data_at(&self, rva: u32) -> Result<&'data [u8]> {
        self.sections
            .pe_data_at(self.data, rva)
            .ok_or(MetadataError::UnmappedRva(rva))
    }
}
