/// Namespace label used for types declared with an empty namespace.
pub const GLOBAL_NAMESPACE: &str = "<global>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Property,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafMember {
    pub name: String,
    pub kind: MemberKind,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Leaf(LeafMember),
    Type(TypeNode),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Leaf(leaf) => &leaf.name,
            Member::Type(type_node) => &type_node.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: String,
    /// The type's own declared namespace, empty for nested types.
    pub namespace: String,
    /// Position of the type in the module's type enumeration.
    pub declaration_index: usize,
    /// Fields, then methods, then properties, then nested types.
    pub members: Vec<Member>,
}

impl TypeNode {
    pub fn leaves(&self) -> impl Iterator<Item = &LeafMember> {
        self.members.iter().filter_map(|member| match member {
            Member::Leaf(leaf) => Some(leaf),
            Member::Type(_) => None,
        })
    }

    pub fn nested_types(&self) -> impl Iterator<Item = &TypeNode> {
        self.members.iter().filter_map(|member| match member {
            Member::Type(nested) => Some(nested),
            Member::Leaf(_) => None,
        })
    }

    /// Sum of the direct field, method and property sizes; nested types excluded.
    pub fn direct_total(&self) -> u64 {
        self.leaves().map(|leaf| leaf.size).sum()
    }

    fn collect_types<'a>(&'a self, out: &mut Vec<&'a TypeNode>) {
        out.push(self);
        for nested in self.nested_types() {
            nested.collect_types(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    pub name: String,
    pub types: Vec<TypeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub name: String,
    pub namespaces: Vec<NamespaceNode>,
}

impl ModuleNode {
    /// Every type in the tree, nested ones included, depth-first.
    pub fn all_types(&self) -> Vec<&TypeNode> {
        let mut types = Vec::new();
        for namespace in &self.namespaces {
            for type_node in &namespace.types {
                type_node.collect_types(&mut types);
            }
        }
        types
    }

    pub fn leaf_count(&self) -> usize {
        self.all_types()
            .iter()
            .map(|type_node| type_node.leaves().count())
            .sum()
    }
}

pub fn namespace_key(namespace: &str) -> &str {
    if namespace.is_empty() {
        GLOBAL_NAMESPACE
    } else {
        namespace
    }
}
