use serde::{Deserialize, Serialize};

use crate::model::{Member, ModuleNode, NamespaceNode, TypeNode};

/// Node of the visualization payload. Leaves carry a `value`, containers carry
/// `children`; the two shapes share no other field, so each node is
/// self-describing without an explicit tag. Container totals are left to the
/// consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreemapNode {
    Leaf {
        name: String,
        value: u64,
    },
    Container {
        name: String,
        children: Vec<TreemapNode>,
    },
}

impl TreemapNode {
    pub fn name(&self) -> &str {
        match self {
            TreemapNode::Leaf { name, .. } | TreemapNode::Container { name, .. } => name,
        }
    }

    pub fn children(&self) -> &[TreemapNode] {
        match self {
            TreemapNode::Leaf { .. } => &[],
            TreemapNode::Container { children, .. } => children,
        }
    }
}

pub fn module_to_treemap(module: &ModuleNode) -> TreemapNode {
    TreemapNode::Container {
        name: module.name.clone(),
        children: module.namespaces.iter().map(namespace_to_treemap).collect(),
    }
}

fn namespace_to_treemap(namespace: &NamespaceNode) -> TreemapNode {
    TreemapNode::Container {
        name: namespace.name.clone(),
        children: namespace.types.iter().map(type_to_treemap).collect(),
    }
}

fn type_to_treemap(type_node: &TypeNode) -> TreemapNode {
    TreemapNode::Container {
        name: type_node.name.clone(),
        children: type_node.members.iter().map(member_to_treemap).collect(),
    }
}

fn member_to_treemap(member: &Member) -> TreemapNode {
    match member {
        Member::Leaf(leaf) => TreemapNode::Leaf {
            name: leaf.name.clone(),
            value: leaf.size,
        },
        Member::Type(nested) => type_to_treemap(nested),
    }
}
