use crate::model::{ModuleNode, namespace_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSizeRow {
    pub qualified_name: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatReport {
    pub module_name: String,
    pub type_sizes: Vec<TypeSizeRow>,
    pub grand_total: u64,
}

/// One row per declared type, nested types included, in declaration order.
///
/// Each row totals only the type's direct fields, methods and properties. A
/// type is qualified by its own namespace, so nested types come out as
/// `<global>.Name` whatever their enclosing type's namespace is.
pub fn aggregate(module: &ModuleNode) -> FlatReport {
    let mut types = module.all_types();
    types.sort_by_key(|type_node| type_node.declaration_index);

    let type_sizes = types
        .into_iter()
        .map(|type_node| TypeSizeRow {
            qualified_name: format!("{}.{}", namespace_key(&type_node.namespace), type_node.name),
            total: type_node.direct_total(),
        })
        .collect::<Vec<_>>();
    let grand_total = type_sizes.iter().map(|row| row.total).sum::<u64>();

    FlatReport {
        module_name: module.name.clone(),
        type_sizes,
        grand_total,
    }
}
