use crate::error::Result;

/// One-based TypeDef row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleIdentity {
    Assembly(String),
    NetModule(String),
}

impl ModuleIdentity {
    pub fn name(&self) -> &str {
        match self {
            ModuleIdentity::Assembly(name) | ModuleIdentity::NetModule(name) => name,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ModuleIdentity::Assembly(name) => format!("<assembly: {name}>"),
            ModuleIdentity::NetModule(name) => format!("<module: {name}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub handle: TypeHandle,
    pub name: String,
    /// Raw namespace string; empty for the global namespace and, by convention,
    /// for every nested type.
    pub namespace: String,
    pub declaring_type: Option<TypeHandle>,
    pub is_nested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub signature_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub name: String,
    pub signature_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    pub name: String,
    pub signature_len: usize,
    pub parameter_names: Vec<String>,
    /// Encoded length of the method body; `None` when the method has no RVA
    /// (abstract, extern, runtime-implemented).
    pub body_len: Option<usize>,
}

/// Everything the size accounting needs to know about a module. Members are
/// returned in declaration order.
pub trait ModuleMetadata {
    fn identity(&self) -> Result<ModuleIdentity>;

    fn type_definitions(&self) -> Result<Vec<TypeDefinition>>;

    fn fields(&self, owner: TypeHandle) -> Result<Vec<FieldDefinition>>;

    fn methods(&self, owner: TypeHandle) -> Result<Vec<MethodDefinition>>;

    fn properties(&self, owner: TypeHandle) -> Result<Vec<PropertyDefinition>>;

    fn nested_types(&self, owner: TypeHandle) -> Result<Vec<TypeHandle>>;
}
