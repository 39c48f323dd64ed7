//! Size accounting for managed (.NET) modules.
//!
//! A module is measured as a namespace → type → member tree whose leaves are
//! fields, methods and properties. The tree is reported either as a flat
//! per-type listing or as a treemap payload for an HTML template.

pub mod args;
pub mod build;
pub mod config;
pub mod error;
pub mod flat;
pub mod logging;
pub mod model;
pub mod render;
pub mod run;
pub mod size;
pub mod treemap;


pub use build::build_module_tree;
pub use config::{OutputMode, RunConfig};
pub use error::{Result, SzError};
pub use flat::{FlatReport, TypeSizeRow, aggregate};
pub use model::{
    GLOBAL_NAMESPACE, LeafMember, Member, MemberKind, ModuleNode, NamespaceNode, TypeNode,
};
pub use render::{TemplateSource, render_flat_report, render_html};
pub use treemap::{TreemapNode, module_to_treemap};
