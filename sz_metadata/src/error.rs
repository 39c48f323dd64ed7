use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PE image: {0}")]
    Object(#[from] object::Error),

    #[error("not a portable executable ({0})")]
    NotPortableExecutable(String),

    #[error("image has no CLI header; not a managed module")]
    NotManaged,

    #[error("bad metadata signature 0x{0:08x}")]
    BadMetadataSignature(u32),

    #[error("metadata version string is not valid UTF-8")]
    BadVersionString,

    #[error("metadata stream {0} is missing")]
    MissingStream(&'static str),

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("RVA 0x{0:x} is not mapped by any section")]
    UnmappedRva(u32),

    #[error("metadata table 0x{0:02x} is not supported")]
    UnsupportedTable(u8),

    #[error("string heap index 0x{0:x} cannot be resolved")]
    BadStringIndex(u32),

    #[error("blob heap index 0x{0:x} cannot be resolved")]
    BadBlobIndex(u32),

    #[error("row {row} is out of range for table {table}")]
    BadRowIndex { table: &'static str, row: u32 },

    #[error("type row {0} owns more than one PropertyMap row")]
    DuplicatePropertyMap(u32),

    #[error("method body at RVA 0x{0:x} cannot be decoded")]
    BadMethodBody(u32),

    #[error("type {type_name} is not reachable exactly once through the nesting table")]
    InconsistentNesting { type_name: String },
}

pub type Result<T> = std::result::Result<T, MetadataError>;
