//! Declared-entity view of a managed (.NET) module.
//!
//! The PE container is parsed with `object`; the CLI metadata root, table
//! stream, `#Strings` and `#Blob` heaps, and method body headers are decoded
//! here. Consumers only see [`ModuleMetadata`] and its plain records.

mod body;
mod cursor;
pub mod error;
mod heaps;
pub mod model;
mod pe;
mod reader;
mod root;
mod tables;


pub use body::method_body_len;
pub use error::{MetadataError, Result};
pub use model::{
    FieldDefinition, MethodDefinition, ModuleIdentity, ModuleMetadata, PropertyDefinition,
    TypeDefinition, TypeHandle,
};
pub use pe::ModuleFile;
pub use reader::MetadataReader;
