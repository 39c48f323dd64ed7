use std::collections::HashSet;

use indexmap::IndexMap;
use sz_metadata::{MetadataError, ModuleMetadata, TypeDefinition, TypeHandle};

use crate::model::{
    LeafMember, Member, MemberKind, ModuleNode, NamespaceNode, TypeNode, namespace_key,
};
use crate::size::{field_size, method_size, property_size};

/// Builds the namespace → type → member tree for one module.
///
/// Any entity the metadata cannot resolve aborts the build; a partial tree
/// would under-report size.
pub fn build_module_tree(metadata: &impl ModuleMetadata) -> Result<ModuleNode, MetadataError> {
    let identity = metadata.identity()?;
    let definitions = metadata.type_definitions()?;
    let index = definitions
        .iter()
        .enumerate()
        .map(|(position, definition)| (definition.handle, (position, definition)))
        .collect::<IndexMap<_, _>>();

    let mut builder = TreeBuilder {
        metadata,
        index: &index,
        built: HashSet::with_capacity(definitions.len()),
    };

    let mut namespaces: IndexMap<String, Vec<TypeNode>> = IndexMap::new();
    for definition in definitions.iter().filter(|d| d.declaring_type.is_none()) {
        let type_node = builder.build_type(definition.handle)?;
        namespaces
            .entry(namespace_key(&definition.namespace).to_string())
            .or_default()
            .push(type_node);
    }

    if let Some(unreached) = definitions
        .iter()
        .find(|definition| !builder.built.contains(&definition.handle))
    {
        return Err(MetadataError::InconsistentNesting {
            type_name: unreached.name.clone(),
        });
    }

    let module = ModuleNode {
        name: identity.label(),
        namespaces: namespaces
            .into_iter()
            .map(|(name, types)| NamespaceNode { name, types })
            .collect(),
    };
    tracing::info!(
        module = %module.name,
        namespaces = module.namespaces.len(),
        types = definitions.len(),
        leaves = module.leaf_count(),
        "built size tree"
    );
    Ok(module)
}

struct TreeBuilder<'a, M> {
    metadata: &'a M,
    index: &'a IndexMap<TypeHandle, (usize, &'a TypeDefinition)>,
    built: HashSet<TypeHandle>,
}

impl<M: ModuleMetadata> TreeBuilder<'_, M> {
    fn build_type(&mut self, handle: TypeHandle) -> Result<TypeNode, MetadataError> {
        let index = self.index;
        let Some(&(declaration_index, definition)) = index.get(&handle) else {
            return Err(MetadataError::BadRowIndex {
                table: "TypeDef",
                row: handle.0,
            });
        };
        // Also guards the recursion below against NestedClass cycles.
        if !self.built.insert(handle) {
            return Err(MetadataError::InconsistentNesting {
                type_name: definition.name.clone(),
            });
        }

        let mut members = Vec::new();
        for field in self.metadata.fields(handle)? {
            let size = field_size(&field);
            members.push(leaf(field.name, MemberKind::Field, size));
        }
        for method in self.metadata.methods(handle)? {
            let size = method_size(&method);
            members.push(leaf(method.name, MemberKind::Method, size));
        }
        for property in self.metadata.properties(handle)? {
            let size = property_size(&property);
            members.push(leaf(property.name, MemberKind::Property, size));
        }
        for nested in self.metadata.nested_types(handle)? {
            members.push(Member::Type(self.build_type(nested)?));
        }

        tracing::debug!(
            type_name = %definition.name,
            namespace = %definition.namespace,
            members = members.len(),
            "built type"
        );
        Ok(TypeNode {
            name: definition.name.clone(),
            namespace: definition.namespace.clone(),
            declaration_index,
            members,
        })
    }
}

fn leaf(name: String, kind: MemberKind, size: u64) -> Member {
    Member::Leaf(LeafMember { name, kind, size })
}
