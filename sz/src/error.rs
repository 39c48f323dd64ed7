use std::path::PathBuf;

use sz_metadata::MetadataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SzError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("failed to serialize size tree: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("template {path} has no {{{{{{data}}}}}} placeholder")]
    TemplatePlaceholderMissing { path: String },
}

pub type Result<T> = std::result::Result<T, SzError>;
